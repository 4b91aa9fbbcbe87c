// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use splitbill::application::SplitService;
use splitbill::domain::{
    AllocationDraft, Cents, Expense, Group, Member, MemberId, Split, SplitStrategy,
};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(SplitService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = SplitService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Test fixture: a three person group created by Alice
pub struct Trio {
    pub group: Group,
    pub alice: MemberId,
    pub bob: MemberId,
    pub carol: MemberId,
}

impl Trio {
    pub async fn create(service: &SplitService) -> Result<Self> {
        Self::create_named(service, "Trip").await
    }

    pub async fn create_named(service: &SplitService, name: &str) -> Result<Self> {
        let group = service
            .create_group(
                name.to_string(),
                Member::new("Alice", "alice@example.com"),
                vec![
                    Member::new("Bob", "bob@example.com"),
                    Member::new("Carol", "carol@example.com"),
                ],
            )
            .await?;
        Ok(Self {
            alice: group.members[0].id,
            bob: group.members[1].id,
            carol: group.members[2].id,
            group,
        })
    }

    /// An expense paid by `payer` with bills given in member order.
    pub fn expense(&self, payer: MemberId, bills: [Cents; 3]) -> Expense {
        let splits = self
            .group
            .members
            .iter()
            .zip(bills)
            .map(|(m, bill)| Split::new(m.id, bill))
            .collect();
        Expense::new(self.group.id, payer, bills.iter().sum(), splits)
    }

    /// Record an expense through the custom allocation flow.
    pub async fn record_custom(
        &self,
        service: &SplitService,
        payer: MemberId,
        bills: [Cents; 3],
    ) -> Result<Expense> {
        let mut draft =
            AllocationDraft::for_group(&self.group, bills.iter().sum(), SplitStrategy::Custom)?;
        for bill in bills {
            draft.set_bill_for_current(bill)?;
            draft.advance()?;
        }
        draft.mark_paid_by(payer)?;
        Ok(service.commit_allocation(&mut draft).await?)
    }
}
