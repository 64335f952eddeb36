use crate::store::Borrower;
use std::fmt::Write;

const HEADERS: [&str; 6] = ["ID", "Name", "Region", "Loan", "Score", "Risk"];

/// Render the borrower table as fixed-width text for the console.
///
/// Returned as a string so the CLI command, the `/dashboard` endpoint, and
/// tests can share one renderer.
pub fn format_dashboard(borrowers: &[Borrower]) -> String {
    let rows: Vec<[String; 6]> = borrowers
        .iter()
        .map(|b| {
            [
                b.id.clone(),
                b.name.clone(),
                b.region.clone(),
                format!("{}", b.loan_amount),
                b.adjusted_score
                    .map(|score| format!("{score:.2}"))
                    .unwrap_or_else(|| "N/A".to_string()),
                b.risk
                    .map(|tier| tier.label().to_string())
                    .unwrap_or_else(|| "N/A".to_string()),
            ]
        })
        .collect();

    let mut widths: [usize; 6] = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    write_row(&mut out, &HEADERS.map(String::from), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    write_row(&mut out, &rule, &widths);
    for row in &rows {
        write_row(&mut out, row, &widths);
    }
    out
}

fn write_row<S: AsRef<str>>(out: &mut String, cells: &[S], widths: &[usize; 6]) {
    for (i, (cell, width)) in cells.iter().zip(widths.iter()).enumerate() {
        if i > 0 {
            out.push_str("  ");
        }
        let _ = write!(out, "{:<width$}", cell.as_ref(), width = *width);
    }
    // Trailing spaces on the last column are just noise.
    while out.ends_with(' ') {
        out.pop();
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::LoanDecision;
    use crate::scoring::RiskTier;

    fn borrower(id: &str, name: &str, score: Option<f64>, risk: Option<RiskTier>) -> Borrower {
        Borrower {
            id: id.to_string(),
            name: name.to_string(),
            region: "Nimba".to_string(),
            loan_amount: 300.0,
            base_score: score,
            adjusted_score: score,
            risk,
            decision: risk.map(|_| LoanDecision::Approved),
        }
    }

    #[test]
    fn renders_header_and_one_line_per_borrower() {
        let table = format_dashboard(&[
            borrower("1", "Maria Johnson", Some(0.78), Some(RiskTier::High)),
            borrower("2", "James Cooper", None, None),
        ]);

        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[2].contains("Maria Johnson"));
        assert!(lines[2].contains("0.78"));
        assert!(lines[3].contains("N/A"));
    }

    #[test]
    fn columns_expand_to_fit_values() {
        let table = format_dashboard(&[borrower(
            "a-very-long-identifier",
            "X",
            Some(0.1),
            Some(RiskTier::Low),
        )]);
        let header = table.lines().next().expect("header line");
        let name_column = header.find("Name").expect("name column present");
        assert!(name_column > "a-very-long-identifier".len());
    }
}
