use anyhow::Result;
use std::io::Read;

use crate::application::SplitService;
use crate::domain::ExpensePayload;

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub errors: Vec<ImportError>,
}

/// Error for one record of the input
#[derive(Debug, Clone)]
pub struct ImportError {
    /// Zero-based position in the input array
    pub index: usize,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Validate every record without appending anything
    pub dry_run: bool,
}

/// Importer that appends expenses given in wire form
/// (`{ groupId, paidBy, total, splits: [{ userId, bill }] }`).
pub struct Importer<'a> {
    service: &'a SplitService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a SplitService) -> Self {
        Self { service }
    }

    /// Import a JSON array of expense payloads. Each record is validated and
    /// appended on its own; one bad record does not stop the others.
    pub async fn import_payloads_json<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let payloads: Vec<ExpensePayload> = serde_json::from_reader(reader)?;
        let mut result = ImportResult::default();

        for (index, payload) in payloads.into_iter().enumerate() {
            let outcome = if options.dry_run {
                self.check(payload).await
            } else {
                self.service
                    .record_payload(payload)
                    .await
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            };

            match outcome {
                Ok(()) => result.imported += 1,
                Err(error) => {
                    tracing::warn!(index, "import record rejected: {}", error);
                    result.errors.push(ImportError { index, error });
                }
            }
        }

        Ok(result)
    }

    async fn check(&self, payload: ExpensePayload) -> Result<(), String> {
        let group = self
            .service
            .get_group_by_id(payload.group_id)
            .await
            .map_err(|e| e.to_string())?;
        payload
            .into_expense()
            .validate(&group)
            .map_err(|e| format!("Invalid expense: {}", e))
    }
}
