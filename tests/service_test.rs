mod common;

use std::sync::Arc;

use anyhow::Result;
use common::{funded, temp_db, test_service};
use xpbank::application::{AppError, LedgerService};
use xpbank::config::LedgerConfig;
use xpbank::storage::StoreError;

#[tokio::test]
async fn test_bank_scenario() -> Result<()> {
    let (service, _temp) = test_service().await?;

    service.register("p1").await?;
    assert_eq!(service.balance_of("p1").await?, 0);
    assert_eq!(service.deposit("p1", 5).await?, 5);
    assert_eq!(service.deposit("p1", 3).await?, 8);
    assert_eq!(service.withdraw("p1", 8).await?, 0);

    let result = service.withdraw("p1", 1).await;
    assert!(matches!(result, Err(AppError::InsufficientFunds { .. })));
    assert_eq!(service.balance_of("p1").await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_balance_of_unknown_account_is_zero_without_registering() -> Result<()> {
    let (service, _temp) = test_service().await?;

    assert_eq!(service.balance_of("stranger").await?, 0);
    assert!(!service.store().exists("stranger").await?);
    assert_eq!(service.stats().await?.account_count, 0);

    Ok(())
}

#[tokio::test]
async fn test_invalid_amounts_are_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded(&service, "p1", 4).await?;

    for result in [
        service.deposit("p1", 0).await,
        service.deposit("p1", -5).await,
        service.withdraw("p1", 0).await,
        service.withdraw("p1", -1).await,
    ] {
        assert!(matches!(result, Err(AppError::InvalidAmount(_))));
    }
    assert_eq!(service.balance_of("p1").await?, 4);

    Ok(())
}

#[tokio::test]
async fn test_parse_failures_map_to_invalid_amount() -> Result<()> {
    let err: AppError = xpbank::parse_levels("lots").unwrap_err().into();
    assert!(matches!(err, AppError::InvalidAmount(_)));
    assert!(err.is_recoverable());
    Ok(())
}

#[tokio::test]
async fn test_insufficient_funds_leaves_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded(&service, "p1", 10).await?;

    match service.withdraw("p1", 11).await {
        Err(AppError::InsufficientFunds {
            account_id,
            balance,
            requested,
        }) => {
            assert_eq!(account_id, "p1");
            assert_eq!(balance, 10);
            assert_eq!(requested, 11);
        }
        other => panic!("expected InsufficientFunds, got {:?}", other),
    }
    assert_eq!(service.balance_of("p1").await?, 10);

    Ok(())
}

#[tokio::test]
async fn test_deposit_then_withdraw_conserves_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded(&service, "p1", 17).await?;

    for n in [1, 5, 17, 250] {
        let before = service.balance_of("p1").await?;
        service.deposit("p1", n).await?;
        service.withdraw("p1", n).await?;
        assert_eq!(service.balance_of("p1").await?, before);
    }

    Ok(())
}

#[tokio::test]
async fn test_balance_never_negative_over_mixed_operations() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.register("p1").await?;

    let ops: [(bool, i64); 8] = [
        (true, 3),
        (false, 5),
        (false, 3),
        (true, 10),
        (false, 4),
        (false, 7),
        (true, 1),
        (false, 2),
    ];
    for (is_deposit, amount) in ops {
        let _ = if is_deposit {
            service.deposit("p1", amount).await
        } else {
            service.withdraw("p1", amount).await
        };
        assert!(service.balance_of("p1").await? >= 0);
    }
    // 3, refused, 0, 10, 6, refused, 7, 5
    assert_eq!(service.balance_of("p1").await?, 5);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_registration() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded(&service, "p1", 6).await?;

    let result = service.register("p1").await;
    assert!(matches!(
        result,
        Err(AppError::Store(StoreError::AlreadyExists(_)))
    ));
    assert!(result.unwrap_err().is_already_exists());
    assert_eq!(service.balance_of("p1").await?, 6);

    Ok(())
}

#[tokio::test]
async fn test_ensure_registered() -> Result<()> {
    let (service, _temp) = test_service().await?;

    assert!(service.ensure_registered("p1").await?);
    service.deposit("p1", 2).await?;
    assert!(!service.ensure_registered("p1").await?);
    assert_eq!(service.balance_of("p1").await?, 2);

    Ok(())
}

#[tokio::test]
async fn test_deposit_to_unknown_account_is_not_found() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service.deposit("ghost", 3).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(!service.store().exists("ghost").await?);

    Ok(())
}

#[tokio::test]
async fn test_withdraw_from_unknown_account_is_insufficient() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = service.withdraw("ghost", 1).await;
    assert!(matches!(
        result,
        Err(AppError::InsufficientFunds { balance: 0, .. })
    ));

    Ok(())
}

#[tokio::test]
async fn test_reopen_restores_balances() -> Result<()> {
    let (db_path, _temp) = temp_db()?;
    let config = LedgerConfig::default().with_database_path(&db_path);

    let service = LedgerService::open(&config).await?;
    funded(&service, "p1", 9).await?;
    funded(&service, "p2", 0).await?;
    service.withdraw("p1", 2).await?;
    service.close().await;

    let service = LedgerService::open(&config).await?;
    assert_eq!(service.balance_of("p1").await?, 7);
    assert_eq!(service.balance_of("p2").await?, 0);
    assert!(service.store().exists("p2").await?);
    service.close().await;

    Ok(())
}

#[tokio::test]
async fn test_operations_after_close_are_unavailable() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded(&service, "p1", 1).await?;
    service.close().await;

    let result = service.balance_of("p1").await;
    assert!(matches!(
        result,
        Err(AppError::Store(StoreError::StorageUnavailable { .. }))
    ));

    Ok(())
}

#[tokio::test]
async fn test_leaderboard() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded(&service, "steve", 12).await?;
    funded(&service, "alex", 40).await?;
    funded(&service, "notch", 3).await?;

    let top = service.leaderboard(2).await?;
    let ids: Vec<&str> = top.iter().map(|a| a.account_id.as_str()).collect();
    assert_eq!(ids, vec!["alex", "steve"]);

    let account = service.account("notch").await?;
    assert_eq!(account.balance, 3);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deposits_do_not_lose_updates() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded(&service, "p1", 5).await?;
    let service = Arc::new(service);

    let mut handles = Vec::new();
    for _ in 0..20 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move { service.deposit("p1", 1).await }));
    }
    for handle in handles {
        handle.await??;
    }

    assert_eq!(service.balance_of("p1").await?, 25);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_never_overdraw() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded(&service, "p1", 10).await?;
    let service = Arc::new(service);

    let mut handles = Vec::new();
    for _ in 0..15 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move { service.withdraw("p1", 1).await }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await?.is_ok() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 10);
    assert_eq!(service.balance_of("p1").await?, 0);
    Ok(())
}
