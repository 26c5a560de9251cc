// Table rendering and audit warnings

use takegrant::{Audited, AuditRecord, Object, Principal};

/// Print rows as a grid with a header line.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        println!("No rows.");
        return;
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let rule: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+";
    println!("{}", rule);
    print_row(headers, &widths);
    println!("{}", rule);
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        print_row(&cells, &widths);
        println!("{}", rule);
    }
}

fn print_row(cells: &[&str], widths: &[usize]) {
    let body: String = cells
        .iter()
        .zip(widths)
        .map(|(cell, w)| format!("| {:<w$} ", cell, w = *w))
        .collect();
    println!("{}|", body);
}

pub fn print_users(users: &[Principal]) {
    let rows: Vec<Vec<String>> = users
        .iter()
        .map(|u| vec![u.id.to_string(), u.username.clone(), u.is_admin.to_string()])
        .collect();
    print_table(&["id", "username", "is_admin"], &rows);
}

pub fn print_objects(objects: &[Object], with_content: bool) {
    let rows: Vec<Vec<String>> = objects
        .iter()
        .map(|o| {
            let mut row = vec![o.id.to_string(), o.name.clone(), o.owner.to_string()];
            if with_content {
                row.push(o.content.clone());
            }
            row
        })
        .collect();
    if with_content {
        print_table(&["id", "name", "owner_id", "content"], &rows);
    } else {
        print_table(&["id", "name", "owner_id"], &rows);
    }
}

pub fn print_audit(records: &[AuditRecord]) {
    if records.is_empty() {
        println!("No audit records.");
        return;
    }
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                r.timestamp.to_string(),
                r.actor.clone(),
                r.action.to_string(),
                r.outcome.to_string(),
                r.target_principal.map(|p| p.to_string()).unwrap_or_default(),
                r.object_name.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(
        &[
            "id",
            "timestamp",
            "user",
            "action",
            "result",
            "target_user_id",
            "object_name",
        ],
        &rows,
    );
}

/// Tell the operator when a command took effect without an audit record.
pub fn warn_unaudited<T>(audited: &Audited<T>) {
    if let Some(err) = &audited.audit_warning {
        eprintln!("warning: command applied but audit record was not written: {}", err);
    }
}
