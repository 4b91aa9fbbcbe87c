mod common;

use anyhow::Result;
use common::{Trio, test_service};
use splitbill::application::{AppError, ErrorKind};
use splitbill::domain::{AllocationError, DraftState, SplitStrategy};

#[tokio::test]
async fn test_equal_split_records_even_shares() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trio = Trio::create(&service).await?;

    let (group, mut draft) = service
        .begin_allocation("Trip", 9000, SplitStrategy::Equal)
        .await?;
    assert_eq!(group.id, trio.group.id);
    assert_eq!(draft.state(), DraftState::ReadyToCommit { remaining: 0 });

    draft.mark_paid_by(trio.alice)?;
    let expense = service.commit_allocation(&mut draft).await?;

    assert!(draft.is_committed());
    assert_eq!(expense.total, 9000);
    assert_eq!(expense.paid_by, trio.alice);
    assert!(expense.splits.iter().all(|s| s.bill == 3000));
    assert_eq!(expense.sequence, 1);
    Ok(())
}

#[tokio::test]
async fn test_equal_split_gives_remainder_to_first_members() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trio = Trio::create(&service).await?;

    let (_, mut draft) = service
        .begin_allocation(&trio.group.id.to_string(), 100, SplitStrategy::Equal)
        .await?;
    draft.mark_paid_by(trio.carol)?;
    let expense = service.commit_allocation(&mut draft).await?;

    let bills: Vec<_> = expense.splits.iter().map(|s| s.bill).collect();
    assert_eq!(bills, vec![34, 33, 33]);
    Ok(())
}

#[tokio::test]
async fn test_custom_split_walkthrough() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trio = Trio::create(&service).await?;

    let (_, mut draft) = service
        .begin_allocation("Trip", 6000, SplitStrategy::Custom)
        .await?;

    draft.enter_bill_for_current("10")?;
    draft.advance()?;
    assert_eq!(draft.remaining(), 5000);

    draft.enter_bill_for_current("20.50")?;
    draft.advance()?;
    draft.enter_bill_for_current("29.50")?;
    draft.mark_current_paid()?;
    draft.advance()?;
    assert_eq!(draft.state(), DraftState::ReadyToCommit { remaining: 0 });

    let expense = service.commit_allocation(&mut draft).await?;
    assert_eq!(expense.paid_by, trio.carol);
    assert_eq!(expense.bill_for(trio.alice), Some(1000));
    assert_eq!(expense.bill_for(trio.bob), Some(2050));
    assert_eq!(expense.bill_for(trio.carol), Some(2950));
    Ok(())
}

#[tokio::test]
async fn test_failed_commit_leaves_draft_and_ledger_untouched() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trio = Trio::create(&service).await?;

    let (_, mut draft) = service
        .begin_allocation("Trip", 9000, SplitStrategy::Custom)
        .await?;
    draft.set_bill_for_current(3000)?;
    draft.advance()?;
    draft.mark_paid_by(trio.alice)?;

    let err = service.commit_allocation(&mut draft).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Allocation(AllocationError::NonZeroRemainder(6000))
    ));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(
        draft.state(),
        DraftState::Collecting {
            cursor: 1,
            remaining: 6000
        }
    );
    assert!(service.list_expenses(trio.group.id).await?.is_empty());

    // Correct the draft and try again
    draft.set_bill_for_current(3000)?;
    draft.advance()?;
    draft.set_bill_for_current(3000)?;
    draft.advance()?;
    service.commit_allocation(&mut draft).await?;
    assert_eq!(service.list_expenses(trio.group.id).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_commit_without_payer_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    Trio::create(&service).await?;

    let (_, mut draft) = service
        .begin_allocation("Trip", 300, SplitStrategy::Equal)
        .await?;
    let err = service.commit_allocation(&mut draft).await.unwrap_err();

    assert!(matches!(err, AppError::Allocation(AllocationError::NoPayer)));
    assert!(!draft.is_committed());
    Ok(())
}

#[tokio::test]
async fn test_committed_draft_cannot_be_recorded_twice() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trio = Trio::create(&service).await?;

    let (_, mut draft) = service
        .begin_allocation("Trip", 300, SplitStrategy::Equal)
        .await?;
    draft.mark_paid_by(trio.bob)?;
    service.commit_allocation(&mut draft).await?;

    let err = service.commit_allocation(&mut draft).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Allocation(AllocationError::AlreadyCommitted)
    ));
    assert_eq!(service.list_expenses(trio.group.id).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_begin_allocation_errors() -> Result<()> {
    let (service, _temp) = test_service().await?;
    Trio::create(&service).await?;

    let err = service
        .begin_allocation("Nowhere", 100, SplitStrategy::Equal)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = service
        .begin_allocation("Trip", 0, SplitStrategy::Custom)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Allocation(AllocationError::NonPositiveTotal(0))
    ));
    Ok(())
}

#[tokio::test]
async fn test_payer_with_zero_bill() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trio = Trio::create(&service).await?;

    let expense = trio.record_custom(&service, trio.alice, [0, 5000, 5000]).await?;
    assert_eq!(expense.bill_for(trio.alice), Some(0));

    let sheet = service.compute_net(trio.group.id, trio.alice).await?;
    assert_eq!(sheet.net_with(trio.bob), 5000);
    assert_eq!(sheet.net_with(trio.carol), 5000);
    Ok(())
}
