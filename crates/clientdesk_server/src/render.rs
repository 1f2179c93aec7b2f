//! Server-side HTML rendering for the index page.
//!
//! # Invariants
//! - Every value read from the store is HTML-escaped before output.
//! - Tick cells carry their raw cell text in `data-value` and the decoded
//!   state in `data-state`. An untouched tick posts back exactly what the
//!   sheet stores; only a click rewrites it.
//! - Editable inputs are plain text, so stored values such as `10,000`
//!   are never blanked by browser number sanitization.

use clientdesk_core::model::client::{NOTES_COLUMN, RECEIVED_AMOUNT_COLUMN};
use clientdesk_core::service::finance::ClientBalance;
use clientdesk_core::{ClientRecord, DeskOverview, TickKind};
use std::fmt::Write;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 1.5rem; }
table { border-collapse: collapse; margin-bottom: 1.5rem; }
th, td { border: 1px solid #ccc; padding: 0.25rem 0.5rem; text-align: left; }
.tick { min-width: 4rem; }
.tick[data-state="PAID"] { background: #ffe08a; }
.tick[data-state="TRUE"] { background: #9be29b; }
.owing { color: #dc3545; }
.settled { color: #198754; }
body:not(.editing) .edit { display: none; }
body.editing .view { display: none; }
"#;

const SCRIPT: &str = r#"
let secret = "";
async function postJson(url, body) {
  const res = await fetch(url, {method: "POST", headers: {"Content-Type": "application/json"}, body: JSON.stringify(body)});
  return res.json();
}
async function toggleEdit() {
  if (document.body.classList.contains("editing")) {
    document.body.classList.remove("editing");
    document.querySelectorAll(".tick").forEach(t => t.disabled = true);
    secret = "";
    return;
  }
  const pwd = prompt("Admin password:");
  if (pwd === null) return;
  const res = await postJson("/verify_password", {password: pwd});
  if (!res.valid) { alert("Wrong password"); return; }
  secret = pwd;
  document.body.classList.add("editing");
  document.querySelectorAll(".tick").forEach(t => t.disabled = false);
}
function cycleTick(el) {
  const v = el.dataset.state;
  let next;
  if (el.dataset.kind === "staged") {
    next = v === "FALSE" ? "PAID" : (v === "PAID" ? "TRUE" : "FALSE");
  } else {
    next = v === "TRUE" ? "FALSE" : "TRUE";
  }
  el.dataset.state = next;
  el.dataset.value = next;
  el.textContent = next;
}
async function saveAll() {
  if (!secret) { alert("Open edit mode first"); return; }
  const updates = {};
  document.querySelectorAll("tr[data-row]").forEach(tr => {
    const row = {};
    tr.querySelectorAll("[data-col]").forEach(el => {
      row[el.dataset.col] = el.classList.contains("tick") ? el.dataset.value : el.value;
    });
    updates[tr.dataset.row] = row;
  });
  const fees = {};
  document.querySelectorAll("input[data-service]").forEach(el => {
    fees[el.dataset.service] = parseFloat(el.value) || 0;
  });
  const res = await postJson("/save", {password: secret, updates: updates, fees: fees});
  if (res.status === "success") { location.reload(); } else { alert("Save failed: " + res.message); }
}
async function addClient(form) {
  const data = Object.fromEntries(new FormData(form).entries());
  data.password = secret || prompt("Admin password:") || "";
  const res = await postJson("/add_client", data);
  if (res.status === "success") { location.reload(); } else { alert("Add failed: " + res.message); }
}
"#;

/// Escapes text for use in element content and quoted attributes.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn kind_attr(kind: TickKind) -> &'static str {
    match kind {
        TickKind::Normal => "normal",
        TickKind::Staged => "staged",
    }
}

fn format_money(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        format!("{amount:.2}")
    }
}

fn render_static_cell(out: &mut String, record: &ClientRecord, column: &str) {
    let value = escape_html(record.get(column));
    let col = escape_html(column);
    if column == NOTES_COLUMN {
        let _ = write!(
            out,
            r#"<td><span class="view">{value}</span><textarea class="edit" data-col="{col}">{value}</textarea></td>"#
        );
    } else {
        let input_mode = if column == RECEIVED_AMOUNT_COLUMN {
            r#" inputmode="decimal""#
        } else {
            ""
        };
        let _ = write!(
            out,
            r#"<td><span class="view">{value}</span><input class="edit" type="text"{input_mode} data-col="{col}" value="{value}"></td>"#
        );
    }
}

fn render_balance_cells(out: &mut String, balance: Option<&ClientBalance>) {
    match balance {
        Some(balance) => {
            let class = if balance.is_settled() { "settled" } else { "owing" };
            let _ = write!(
                out,
                r#"<td>{}</td><td class="{class}">{}</td>"#,
                format_money(balance.total_required),
                format_money(balance.remaining)
            );
        }
        None => out.push_str("<td></td><td></td>"),
    }
}

fn render_client_table(out: &mut String, overview: &DeskOverview) {
    let schema = &overview.schema;
    out.push_str(r#"<input id="search" placeholder="Search" oninput="filterRows(this.value)">"#);
    out.push_str(r#"<table id="clients"><thead><tr>"#);
    for column in schema.header() {
        let _ = write!(out, "<th>{}</th>", escape_html(&column));
    }
    out.push_str("<th>Total Required</th><th>Remaining</th></tr></thead><tbody>");

    for record in &overview.clients {
        let _ = write!(out, r#"<tr data-row="{}">"#, record.row_index);
        for column in schema.static_columns() {
            render_static_cell(out, record, column);
        }
        for column in schema.tick_columns() {
            let state = record.tick_state(column);
            let _ = write!(
                out,
                r#"<td><button class="tick" type="button" disabled data-col="{}" data-kind="{}" data-state="{}" data-value="{}" onclick="cycleTick(this)">{}</button></td>"#,
                escape_html(&column.name),
                kind_attr(column.kind),
                state.as_cell(),
                escape_html(record.get(&column.name)),
                state.as_cell()
            );
        }
        let balance = overview
            .balances
            .iter()
            .find(|balance| balance.row_index == record.row_index);
        render_balance_cells(out, balance);
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
}

fn render_fee_table(out: &mut String, overview: &DeskOverview) {
    out.push_str("<h2>Fees</h2><table><thead><tr><th>Service</th><th>Amount</th></tr></thead><tbody>");
    for (service, amount) in overview.fees.iter() {
        let service = escape_html(service);
        let amount = format_money(amount);
        let _ = write!(
            out,
            r#"<tr><td>{service}</td><td><span class="view">{amount}</span><input class="edit" type="number" data-service="{service}" value="{amount}"></td></tr>"#
        );
    }
    out.push_str("</tbody></table>");

    if overview.custom_fees.is_empty() {
        return;
    }
    out.push_str("<h2>Custom fees</h2><table><thead><tr><th>Service</th><th>Client</th><th>Amount</th></tr></thead><tbody>");
    for fee in &overview.custom_fees {
        let _ = write!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&fee.service),
            escape_html(&fee.client),
            format_money(fee.amount)
        );
    }
    out.push_str("</tbody></table>");
}

fn render_add_form(out: &mut String) {
    out.push_str(
        r#"<h2>Add client</h2><form onsubmit="addClient(this); return false;">
<input name="name" placeholder="Name" required>
<input name="email" placeholder="Email">
<input name="uni" placeholder="University">
<input name="phone" placeholder="Phone">
<button type="submit">Add</button></form>"#,
    );
}

/// Full index page for `overview`.
pub fn index_page(overview: &DeskOverview) -> String {
    let mut out = String::with_capacity(16 * 1024);
    let _ = write!(
        out,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>ClientDesk</title><style>{STYLE}</style></head><body>"
    );
    let _ = write!(
        out,
        r#"<h1>ClientDesk</h1><p>{} clients. <button type="button" onclick="toggleEdit()">Edit</button> <button type="button" class="edit" onclick="saveAll()">Save</button></p>"#,
        overview.clients.len()
    );
    render_client_table(&mut out, overview);
    render_fee_table(&mut out, overview);
    render_add_form(&mut out);
    let _ = write!(
        out,
        r#"<script>{SCRIPT}
function filterRows(q) {{
  q = q.toLowerCase().trim();
  document.querySelectorAll("tr[data-row]").forEach(tr => {{
    tr.style.display = tr.textContent.toLowerCase().includes(q) ? "" : "none";
  }});
}}
</script></body></html>"#
    );
    out
}

/// Minimal page shown when the store cannot be read.
pub fn error_page(message: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>ClientDesk</title></head><body><h1>Store unavailable</h1><p>{}</p></body></html>",
        escape_html(message)
    )
}

#[cfg(test)]
mod tests {
    use super::{escape_html, format_money, index_page};
    use clientdesk_core::model::client::RECEIVED_AMOUNT_COLUMN;
    use clientdesk_core::service::finance::compute_balance;
    use clientdesk_core::{ClientRecord, ClientSchema, CustomFeeTable, DeskOverview, FeeSchedule};
    use std::collections::BTreeMap;

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<b onclick="x">'&'</b>"#),
            "&lt;b onclick=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn format_money_drops_zero_fraction() {
        assert_eq!(format_money(26_000.0), "26000");
        assert_eq!(format_money(12.5), "12.50");
    }

    #[test]
    fn index_page_escapes_client_values_and_shows_tick_states() {
        let schema = ClientSchema::default();
        let mut values = BTreeMap::new();
        values.insert("Name".to_string(), "<script>alert(1)</script>".to_string());
        values.insert("Foreign Fees".to_string(), "PAID".to_string());
        let record = ClientRecord::new(0, values);
        let fees = FeeSchedule::defaults_for(&schema);
        let balance = compute_balance(&record, &schema, &fees, &CustomFeeTable::new());
        let overview = DeskOverview {
            schema,
            clients: vec![record],
            fees,
            custom_fees: Vec::new(),
            balances: vec![balance],
        };

        let page = index_page(&overview);
        assert!(!page.contains("<script>alert(1)</script>"));
        assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(page.contains(
            r#"data-col="Foreign Fees" data-kind="staged" data-state="PAID" data-value="PAID""#
        ));
        assert!(page.contains(r#"data-row="0""#));
        assert!(page.contains("26000"));
    }

    fn overview_for(values: &[(&str, &str)]) -> DeskOverview {
        let schema = ClientSchema::default();
        let values: BTreeMap<String, String> = values
            .iter()
            .map(|(column, value)| ((*column).to_string(), (*value).to_string()))
            .collect();
        let record = ClientRecord::new(0, values);
        let fees = FeeSchedule::defaults_for(&schema);
        let balance = compute_balance(&record, &schema, &fees, &CustomFeeTable::new());
        DeskOverview {
            schema,
            clients: vec![record],
            fees,
            custom_fees: Vec::new(),
            balances: vec![balance],
        }
    }

    #[test]
    fn received_amount_input_keeps_formatted_text() {
        let page = index_page(&overview_for(&[("Name", "Ali"), (RECEIVED_AMOUNT_COLUMN, "10,000")]));
        assert!(page.contains(
            r#"type="text" inputmode="decimal" data-col="Received Amount" value="10,000""#
        ));
        assert!(!page.contains(r#"type="number" data-col"#));
    }

    #[test]
    fn tick_posts_raw_cell_text_until_clicked() {
        let page = index_page(&overview_for(&[
            ("Name", "Ali"),
            ("Documents", "PAID"),
            ("National ID", "pending <scan>"),
        ]));
        assert!(page.contains(
            r#"data-col="Documents" data-kind="normal" data-state="FALSE" data-value="PAID""#
        ));
        assert!(page.contains(
            r#"data-col="National ID" data-kind="normal" data-state="FALSE" data-value="pending &lt;scan&gt;""#
        ));
    }
}
