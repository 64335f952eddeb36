use crate::assessment::{AssessmentService, BorrowerDraft};
use crate::store::StoreError;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::warn;

/// One row of a borrower intake CSV: `name,region,loan_amount[,repayment_rate]`.
/// An absent or empty repayment rate falls back to the service default of 0.9.
#[derive(Debug, Deserialize)]
struct ImportRow {
    name: String,
    region: String,
    loan_amount: f64,
    #[serde(default)]
    repayment_rate: Option<f64>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    /// Rows that failed to parse; logged and skipped.
    pub rejected: usize,
}

/// Load a borrower CSV and run every row through the assessment pipeline,
/// so imported records land with consistent derived fields.
pub fn import_borrowers_from_path(
    service: &AssessmentService,
    path: &Path,
) -> Result<ImportSummary, ImportError> {
    let reader = csv::Reader::from_path(path).map_err(ImportError::Csv)?;
    import_borrowers(service, reader)
}

pub fn import_borrowers<R: Read>(
    service: &AssessmentService,
    mut reader: csv::Reader<R>,
) -> Result<ImportSummary, ImportError> {
    let mut summary = ImportSummary::default();
    for (line, result) in reader.deserialize::<ImportRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                warn!(line = line + 2, %err, "rejecting malformed borrower row");
                summary.rejected += 1;
                continue;
            }
        };
        service.create(&BorrowerDraft {
            name: row.name,
            region: row.region,
            loan_amount: row.loan_amount,
            repayment_rate: row.repayment_rate.unwrap_or(0.9),
        })?;
        summary.imported += 1;
    }
    Ok(summary)
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to open borrower CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to persist imported borrower: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ApprovalPolicy;
    use crate::regional::RegionalData;
    use crate::store::BorrowerStore;
    use std::io::Cursor;

    fn service() -> AssessmentService {
        AssessmentService::new(
            BorrowerStore::open_in_memory().expect("store opens"),
            RegionalData::builtin(),
            ApprovalPolicy::default(),
            None,
        )
    }

    #[test]
    fn imports_rows_and_defaults_the_repayment_rate() {
        let service = service();
        let csv = "name,region,loan_amount,repayment_rate\n\
                   Maria Johnson,Montserrado,500,0.7\n\
                   James Cooper,Bong,1200,\n";
        let summary = import_borrowers(&service, csv::Reader::from_reader(Cursor::new(csv)))
            .expect("import succeeds");

        assert_eq!(summary.imported, 2);
        assert_eq!(summary.rejected, 0);

        let all = service.list().expect("list");
        let james = all.iter().find(|b| b.name == "James Cooper").expect("row");
        assert_eq!(james.base_score, Some(0.9));
        assert!(james.adjusted_score.is_some());
        assert!(james.risk.is_some());
    }

    #[test]
    fn malformed_rows_are_rejected_without_stopping_the_import() {
        let service = service();
        let csv = "name,region,loan_amount\n\
                   Maria Johnson,Montserrado,not-a-number\n\
                   Sarah Williams,Nimba,300\n";
        let summary = import_borrowers(&service, csv::Reader::from_reader(Cursor::new(csv)))
            .expect("import succeeds");

        assert_eq!(summary.imported, 1);
        assert_eq!(summary.rejected, 1);
        assert_eq!(service.list().expect("list").len(), 1);
    }
}
