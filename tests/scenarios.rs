use bank_ledger::{
    HashParams, JsonFileStorage, Ledger, LedgerConfig, LedgerError, LedgerStorage,
    ValidationError,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::TempDir;

fn config(dir: &TempDir) -> LedgerConfig {
    LedgerConfig {
        data_file: dir.path().join("data.json"),
        hash_params: HashParams::low_cost(),
        ..Default::default()
    }
}

fn balance(ledger: &Ledger, account_id: &str) -> Decimal {
    ledger.account_by_id(account_id).unwrap().balance
}

#[test]
fn banking_walkthrough() {
    let dir = TempDir::new().unwrap();
    let ledger = Ledger::from_config(&config(&dir)).unwrap();

    // a fresh bank with two customers
    let b1 = ledger.create_bank("B1").unwrap();
    let alice = ledger.create_customer(&b1, "Alice", "alice", "pw1").unwrap();
    let alice_accounts = ledger.accounts_for_username("alice");
    assert_eq!(alice_accounts.len(), 1);
    assert_eq!(alice_accounts[0].id, "1000");
    assert_eq!(alice_accounts[0].customer_id, alice.id);
    assert_eq!(alice_accounts[0].bank_id, b1.id);
    assert_eq!(balance(&ledger, "1000"), Decimal::ZERO);

    // recharge
    assert_eq!(ledger.recharge("1000", dec!(100)).unwrap(), dec!(100));
    assert!(ledger.recharge("1000", dec!(-5)).is_err());
    assert_eq!(balance(&ledger, "1000"), dec!(100));

    // transfer to a second customer
    ledger.create_customer(&b1, "Bob", "bob", "pw2").unwrap();
    assert_eq!(ledger.accounts_for_username("bob")[0].id, "1001");
    ledger.transfer("1000", "1001", dec!(50)).unwrap();
    assert_eq!(balance(&ledger, "1000"), dec!(50));
    assert_eq!(balance(&ledger, "1001"), dec!(50));

    // insufficient funds
    let err = ledger.transfer("1000", "1001", dec!(1000)).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Validation(ValidationError::InsufficientFunds { .. })
    ));
    assert_eq!(balance(&ledger, "1000"), dec!(50));
    assert_eq!(balance(&ledger, "1001"), dec!(50));

    // admin cannot set a negative balance
    assert!(ledger.update_account_balance("1001", dec!(-10)).is_err());
    assert_eq!(balance(&ledger, "1001"), dec!(50));

    // authentication
    assert!(ledger.authenticate("alice", "wrong").is_err());
    assert_eq!(ledger.authenticate("alice", "pw1").unwrap(), alice);

    // all of it is on disk
    let stored = JsonFileStorage::new(dir.path().join("data.json"))
        .load()
        .unwrap()
        .unwrap();
    assert_eq!(stored, ledger.snapshot());
}

#[test]
fn duplicate_username_keeps_first_customer() {
    let dir = TempDir::new().unwrap();
    let ledger = Ledger::from_config(&config(&dir)).unwrap();
    let bank = ledger.banks()[0].clone();

    let first = ledger.create_customer(&bank, "Alice", "alice", "pw1").unwrap();
    assert!(ledger.create_customer(&bank, "Alice 2", "alice", "pw2").is_err());

    let alices: Vec<_> = ledger
        .customers()
        .into_iter()
        .filter(|c| c.username == "alice")
        .collect();
    assert_eq!(alices, vec![first]);
    assert_eq!(ledger.accounts().len(), 1);
}

#[test]
fn reload_round_trip() {
    let dir = TempDir::new().unwrap();
    let before = {
        let ledger = Ledger::from_config(&config(&dir)).unwrap();
        let bank = ledger.banks()[0].clone();
        ledger.create_customer(&bank, "Alice", "alice", "pw1").unwrap();
        ledger.create_customer(&bank, "Bob", "bob", "pw2").unwrap();
        ledger.recharge("1000", dec!(12.34)).unwrap();
        ledger.transfer("1000", "1001", dec!(2.34)).unwrap();
        ledger
            .update_account_interest_rate("1001", dec!(0.035))
            .unwrap();
        ledger.snapshot()
    };

    let reloaded = Ledger::from_config(&config(&dir)).unwrap();
    assert_eq!(reloaded.snapshot(), before);
    assert_eq!(balance(&reloaded, "1000"), dec!(10));
    assert_eq!(balance(&reloaded, "1001"), dec!(2.34));
    assert!(reloaded.authenticate("bob", "pw2").is_ok());
    assert_eq!(
        reloaded.customers().iter().filter(|c| c.is_admin()).count(),
        1
    );
}

#[test]
fn reload_keeps_exact_amounts() {
    let dir = TempDir::new().unwrap();
    let before = {
        let ledger = Ledger::from_config(&config(&dir)).unwrap();
        let bank = ledger.banks()[0].clone();
        ledger.create_customer(&bank, "Alice", "alice", "pw1").unwrap();
        ledger.create_customer(&bank, "Bob", "bob", "pw2").unwrap();
        ledger
            .recharge("1000", dec!(12345678901234567.89))
            .unwrap();
        ledger.update_account_balance("1001", Decimal::MAX).unwrap();
        ledger
            .update_account_interest_rate("1001", dec!(0.0123456789012345678901234567))
            .unwrap();
        assert!(ledger.last_persistence_error().is_none());
        ledger.snapshot()
    };

    let reloaded = Ledger::from_config(&config(&dir)).unwrap();
    assert_eq!(reloaded.snapshot(), before);
    assert_eq!(
        balance(&reloaded, "1000").to_string(),
        "12345678901234567.89"
    );
    assert_eq!(balance(&reloaded, "1001"), Decimal::MAX);
    assert_eq!(
        reloaded.account_by_id("1001").unwrap().interest_rate,
        dec!(0.0123456789012345678901234567)
    );
}

#[test]
fn exhausted_account_ids_reject_new_accounts() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.json");
    std::fs::write(
        &path,
        r#"{
            "banks": [{"id": "B1", "name": "First"}],
            "customers": [{"id": "C001", "username": "root", "roles": ["admin"]}],
            "accounts": [{"id": "18446744073709551615", "bankId": "B1", "customerId": "C001"}]
        }"#,
    )
    .unwrap();

    let ledger = Ledger::from_config(&config(&dir)).unwrap();
    let before = ledger.snapshot();
    let bank = ledger.banks()[0].clone();

    let err = ledger
        .create_customer(&bank, "Alice", "alice", "pw1")
        .unwrap_err();
    assert!(matches!(err, LedgerError::IdsExhausted(_)));
    let root = ledger.customer_by_username("root").unwrap();
    let err = ledger.create_account(&root, "B1").unwrap_err();
    assert!(matches!(err, LedgerError::IdsExhausted(_)));

    assert_eq!(ledger.snapshot(), before);
    assert!(!ledger.is_username_taken("alice"));
    // existing accounts keep working
    ledger.recharge("18446744073709551615", dec!(5)).unwrap();
}

#[test]
fn ids_keep_growing_after_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.json");
    // IDs above anything the counters would produce on their own, plus a
    // few that don't parse
    std::fs::write(
        &path,
        r#"{
            "banks": [{"id": "B1", "name": "First"}],
            "customers": [
                {"id": "C041", "username": "carol", "roles": ["admin"]},
                {"id": "legacy-7", "username": "dave"}
            ],
            "accounts": [
                {"id": "2999", "bankId": "B1", "customerId": "C041"},
                {"id": "ACC-1", "bankId": "B1", "customerId": "C041"}
            ]
        }"#,
    )
    .unwrap();

    let ledger = Ledger::from_config(&config(&dir)).unwrap();
    assert_eq!(ledger.customers().len(), 2);
    assert_eq!(ledger.accounts().len(), 2);

    let bank = ledger.banks()[0].clone();
    let erin = ledger.create_customer(&bank, "Erin", "erin", "pw").unwrap();
    assert_eq!(erin.id, "C042");
    assert_eq!(ledger.accounts_for_username("erin")[0].id, "3000");
    drop(ledger);

    let ledger = Ledger::from_config(&config(&dir)).unwrap();
    let frank = ledger.create_customer(&bank, "Frank", "frank", "pw").unwrap();
    assert_eq!(frank.id, "C043");
    assert_eq!(ledger.accounts_for_username("frank")[0].id, "3001");
}

#[test]
fn corrupt_document_is_not_overwritten() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.json");
    std::fs::write(&path, "{\"banks\": [").unwrap();

    assert!(matches!(
        Ledger::from_config(&config(&dir)),
        Err(LedgerError::Persistence(_))
    ));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"banks\": [");
}

#[test]
fn unwritable_storage_does_not_block_operations() {
    let dir = TempDir::new().unwrap();
    let config = LedgerConfig {
        data_file: dir.path().join("gone").join("data.json"),
        ..config(&dir)
    };
    let ledger = Ledger::from_config(&config).unwrap();
    assert!(ledger.last_persistence_error().is_some());

    let bank = ledger.banks()[0].clone();
    ledger.create_customer(&bank, "Alice", "alice", "pw1").unwrap();
    assert_eq!(ledger.recharge("1000", dec!(5)).unwrap(), dec!(5));
    assert!(!config.data_file.exists());

    std::fs::create_dir(dir.path().join("gone")).unwrap();
    ledger.withdraw("1000", dec!(1)).unwrap();
    assert!(ledger.last_persistence_error().is_none());
    assert!(config.data_file.exists());
}

#[test]
fn concurrent_transfers_conserve_money() {
    let dir = TempDir::new().unwrap();
    let ledger = Ledger::from_config(&config(&dir)).unwrap();
    let bank = ledger.banks()[0].clone();
    ledger.create_customer(&bank, "Alice", "alice", "pw1").unwrap();
    ledger.create_customer(&bank, "Bob", "bob", "pw2").unwrap();
    ledger.recharge("1000", dec!(100)).unwrap();

    std::thread::scope(|scope| {
        for (from, to) in [("1000", "1001"), ("1001", "1000"), ("1000", "1001")] {
            let ledger = &ledger;
            scope.spawn(move || {
                for _ in 0..50 {
                    // rejections for lack of funds are fine
                    let _ = ledger.transfer(from, to, dec!(3));
                }
            });
        }
    });

    let total = balance(&ledger, "1000") + balance(&ledger, "1001");
    assert_eq!(total, dec!(100));
    assert!(balance(&ledger, "1000") >= Decimal::ZERO);
    assert!(balance(&ledger, "1001") >= Decimal::ZERO);
}
