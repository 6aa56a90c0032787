//! Minimal HTML page rendering
//!
//! Boundary stubs standing in for a real template layer: plain tables
//! and forms, no assets beyond what `/static` serves. Everything
//! user-supplied is escaped.

use crate::db::schema::{AppealRow, ClampRow, UserRow};
use crate::respond::Flash;

pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, flashes: &[Flash], body: &str) -> String {
    let mut flash_html = String::new();
    for flash in flashes {
        flash_html.push_str(&format!(
            "<p class=\"flash {}\">{}</p>\n",
            escape(&flash.level),
            escape(&flash.message)
        ));
    }
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{}</title></head>\
         <body><h1>{}</h1>\n{}{}</body></html>",
        escape(title),
        escape(title),
        flash_html,
        body
    )
}

fn clamp_table(clamps: &[ClampRow]) -> String {
    let mut rows = String::new();
    for c in clamps {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td></tr>\n",
            c.id,
            escape(&c.location),
            escape(c.registration.as_deref().unwrap_or("")),
            c.clamp_date.format("%Y-%m-%d"),
            escape(&c.payment_status),
            c.amount_paid.unwrap_or(0.0),
        ));
    }
    format!(
        "<table><tr><th>Id</th><th>Location</th><th>Registration</th>\
         <th>Date</th><th>Status</th><th>Amount</th></tr>\n{rows}</table>"
    )
}

pub fn index(clamps: &[ClampRow], users: &[UserRow], flashes: &[Flash]) -> String {
    let mut accounts = String::new();
    for u in users {
        accounts.push_str(&format!(
            "<li>{}{}</li>\n",
            escape(&u.username),
            if u.is_admin { " (admin)" } else { "" }
        ));
    }
    let body = format!(
        "{}\n<h2>Accounts</h2><ul>{}</ul>",
        clamp_table(clamps),
        accounts
    );
    layout("Clamp Records", flashes, &body)
}

pub fn dashboard(clamps: &[ClampRow], flashes: &[Flash]) -> String {
    layout("Dashboard", flashes, &clamp_table(clamps))
}

pub fn clamp_list(clamps: &[ClampRow], flashes: &[Flash]) -> String {
    layout("Clamp List", flashes, &clamp_table(clamps))
}

pub fn clamp_form(existing: Option<&ClampRow>, flashes: &[Flash]) -> String {
    let (title, action) = match existing {
        Some(c) => ("Edit Clamp".to_string(), format!("/edit-clamp/{}", c.id)),
        None => ("Add Clamp".to_string(), "/add-clamp".to_string()),
    };
    let location = existing.map(|c| escape(&c.location)).unwrap_or_default();
    let offense = existing.map(|c| escape(&c.offense)).unwrap_or_default();
    let body = format!(
        "<form method=\"post\" action=\"{action}\" enctype=\"multipart/form-data\">\
         <input name=\"location\" value=\"{location}\">\
         <input name=\"registration\">\
         <input name=\"clamp_date\" type=\"date\">\
         <input name=\"time_in\" type=\"time\">\
         <input name=\"time_called\" type=\"time\">\
         <input name=\"time_released\" type=\"time\">\
         <input name=\"car_type\"><input name=\"color\"><input name=\"clamp_ref\">\
         <input name=\"offense\" value=\"{offense}\">\
         <select name=\"payment_status\"><option>Processing</option>\
         <option>Paid</option><option>Not Paid</option></select>\
         <input name=\"amount_paid\"><input name=\"image\" type=\"file\">\
         <button type=\"submit\">Save</button></form>"
    );
    layout(&title, flashes, &body)
}

pub fn appeals(appeals: &[AppealRow], flashes: &[Flash]) -> String {
    let mut rows = String::new();
    for a in appeals {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            a.id,
            a.clamp_id,
            a.appeal_date.format("%Y-%m-%d"),
            escape(&a.appeal_reason),
            escape(&a.appeal_status),
        ));
    }
    let body = format!(
        "<table><tr><th>Id</th><th>Clamp</th><th>Date</th>\
         <th>Reason</th><th>Status</th></tr>\n{rows}</table>"
    );
    layout("Appeals", flashes, &body)
}

pub fn users(users: &[UserRow], flashes: &[Flash]) -> String {
    let mut rows = String::new();
    for u in users {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            u.id,
            escape(&u.username),
            if u.is_admin { "admin" } else { "user" },
        ));
    }
    let body = format!(
        "<table><tr><th>Id</th><th>Username</th><th>Role</th></tr>\n{rows}</table>\
         <form method=\"post\" action=\"/users/add\">\
         <input name=\"username\"><input name=\"password\" type=\"password\">\
         <label><input name=\"is_admin\" type=\"checkbox\" value=\"1\">Admin</label>\
         <button type=\"submit\">Add user</button></form>"
    );
    layout("Accounts", flashes, &body)
}

pub fn login(next: Option<&str>, flashes: &[Flash]) -> String {
    let action = match next {
        Some(next) if !next.is_empty() => format!("/login?next={}", escape(next)),
        _ => "/login".to_string(),
    };
    let body = format!(
        "<form method=\"post\" action=\"{action}\">\
         <input name=\"username\"><input name=\"password\" type=\"password\">\
         <button type=\"submit\">Log in</button></form>"
    );
    layout("Log in", flashes, &body)
}

pub fn change_password(flashes: &[Flash]) -> String {
    let body = "<form method=\"post\" action=\"/change-password\">\
         <input name=\"current_password\" type=\"password\">\
         <input name=\"new_password\" type=\"password\">\
         <input name=\"confirm_password\" type=\"password\">\
         <button type=\"submit\">Change password</button></form>";
    layout("Change Password", flashes, body)
}

pub fn access_denied() -> String {
    layout(
        "Access Denied",
        &[],
        "<p>Admin access required to view this page.</p>",
    )
}

pub fn invoicing(paid: &[ClampRow], total: f64, flashes: &[Flash]) -> String {
    let body = format!(
        "{}\n<p>Total collected: {total:.2}</p>",
        clamp_table(paid)
    );
    layout("Invoicing", flashes, &body)
}

pub fn invoice(clamp: &ClampRow) -> String {
    let body = format!(
        "<p>Clamp #{} at {} on {}: {} ({:.2})</p>",
        clamp.id,
        escape(&clamp.location),
        clamp.clamp_date.format("%Y-%m-%d"),
        escape(&clamp.payment_status),
        clamp.amount_paid.unwrap_or(0.0),
    );
    layout("Invoice", &[], &body)
}
