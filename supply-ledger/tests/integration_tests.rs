//! End-to-end tests driving the ledger through its actor handle

use rust_decimal::Decimal;
use supply_ledger::{dispute::Penalty, Config, Error, Ledger, Party, TransactionStatus};

async fn setup() -> Ledger {
    let ledger = Ledger::open(Config::default()).unwrap();
    ledger.register_manufacturer(Decimal::from(10_000)).await.unwrap();
    for d in ["D1", "D2", "D3"] {
        ledger.register_distributor(d, Decimal::from(5_000)).await.unwrap();
    }
    for c in ["C1", "C2", "C3"] {
        ledger.register_client(c, Decimal::from(2_000)).await.unwrap();
    }
    ledger
}

#[tokio::test]
async fn test_full_lifecycle_with_all_dispute_outcomes() {
    let ledger = setup().await;
    ledger.register_node("N1", Decimal::from(10)).await.unwrap();

    // D1 -> C1: dispatched and received
    ledger.submit("D1", "C1", "P-1", Some(Decimal::from(50))).await.unwrap();
    ledger.record_dispatch("D1").await.unwrap();
    ledger.record_receipt("C1").await.unwrap();

    // D2 -> C2: dispatched, receipt never recorded
    ledger.submit("D2", "C2", "P-2", Some(Decimal::from(70))).await.unwrap();
    ledger.record_dispatch("D2").await.unwrap();

    // D3 -> C3: nothing happened
    ledger.submit("D3", "C3", "P-3", Some(Decimal::from(90))).await.unwrap();

    let outcome = ledger.resolve_disputes().await.unwrap();
    assert_eq!(outcome.confirmed.len(), 1);
    assert_eq!(outcome.rejected.len(), 2);
    assert_eq!(outcome.confirmed[0].status(), TransactionStatus::Confirmed);
    assert!(outcome
        .rejected
        .iter()
        .all(|tx| tx.status() == TransactionStatus::Rejected));

    let penalized: Vec<&Party> = outcome.penalties.iter().map(|p: &Penalty| &p.party).collect();
    assert_eq!(
        penalized,
        vec![&Party::Client("C2".into()), &Party::Distributor("D3".into())]
    );

    let balances = ledger.balances().await.unwrap();
    assert_eq!(balances.clients["C1"], Decimal::from(1_950));
    assert_eq!(balances.clients["C2"], Decimal::from(1_000));
    assert_eq!(balances.clients["C3"], Decimal::from(2_000));
    assert_eq!(balances.distributors["D1"], Decimal::from(5_000));
    assert_eq!(balances.distributors["D3"], Decimal::from(4_000));

    assert!(ledger.pending().await.unwrap().is_empty());
    assert_eq!(ledger.confirmed().await.unwrap().len(), 1);

    let round = ledger.seal_block().await.unwrap();
    assert_eq!(round.validator_id, "N1");
    assert_eq!(round.block.height(), 1);
    assert_eq!(round.block.transactions().len(), 1);
    assert_eq!(round.validator_stake, Decimal::from(15));
    assert!(ledger.confirmed().await.unwrap().is_empty());

    ledger.verify_chain().await.unwrap();
    ledger.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_sealing_without_validators_can_be_retried() {
    let ledger = setup().await;

    ledger.submit("D1", "C1", "P-1", Some(Decimal::from(50))).await.unwrap();
    ledger.record_dispatch("D1").await.unwrap();
    ledger.record_receipt("C1").await.unwrap();
    ledger.resolve_disputes().await.unwrap();

    assert!(matches!(
        ledger.seal_block().await,
        Err(Error::NoValidatorsAvailable)
    ));
    assert_eq!(ledger.chain().await.unwrap().len(), 1);
    assert_eq!(ledger.confirmed().await.unwrap().len(), 1);

    ledger.register_node("N1", Decimal::from(1)).await.unwrap();
    let round = ledger.seal_block().await.unwrap();
    assert_eq!(round.block.transactions().len(), 1);
    assert_eq!(ledger.chain().await.unwrap().len(), 2);

    ledger.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_highest_stake_seals_and_ties_go_to_first() {
    let ledger = setup().await;
    ledger.register_node("A", Decimal::from(10)).await.unwrap();
    ledger.register_node("B", Decimal::from(30)).await.unwrap();
    ledger.register_node("C", Decimal::from(30)).await.unwrap();

    let round = ledger.seal_block().await.unwrap();
    assert_eq!(round.validator_id, "B");
    assert_eq!(round.reward, Decimal::from(5));
    assert_eq!(round.validator_stake, Decimal::from(35));

    // B keeps winning now that it leads outright
    let round = ledger.seal_block().await.unwrap();
    assert_eq!(round.validator_id, "B");

    // Staking lets C overtake
    assert_eq!(ledger.stake("C", Decimal::from(20)).await.unwrap(), Decimal::from(50));
    let round = ledger.seal_block().await.unwrap();
    assert_eq!(round.validator_id, "C");

    let balances = ledger.balances().await.unwrap();
    assert_eq!(
        balances.validators,
        vec![
            ("A".to_string(), Decimal::from(10)),
            ("B".to_string(), Decimal::from(40)),
            ("C".to_string(), Decimal::from(55)),
        ]
    );

    ledger.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_admission_control() {
    let ledger = setup().await;

    ledger.submit("D1", "C1", "P-1", None).await.unwrap();
    assert!(matches!(
        ledger.submit("D1", "C2", "P-2", None).await,
        Err(Error::DuplicatePendingTransaction(_))
    ));
    assert!(matches!(
        ledger.submit("D9", "C1", "P-3", None).await,
        Err(Error::UnknownParty(_))
    ));

    // A distributor is free again once its transaction leaves pending
    ledger.resolve_disputes().await.unwrap();
    ledger.submit("D1", "C2", "P-2", None).await.unwrap();

    ledger.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_events_without_match() {
    let ledger = setup().await;

    assert!(matches!(
        ledger.record_dispatch("D1").await,
        Err(Error::NoMatchingTransaction(_))
    ));
    ledger.submit("D1", "C1", "P-1", None).await.unwrap();
    // Receipt before dispatch has nothing to match
    assert!(matches!(
        ledger.record_receipt("C1").await,
        Err(Error::NoMatchingTransaction(_))
    ));

    ledger.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_chain_links_over_rounds_and_snapshot() {
    let ledger = setup().await;
    ledger.register_node("N1", Decimal::from(5)).await.unwrap();

    for (d, c) in [("D1", "C1"), ("D2", "C2")] {
        ledger.submit(d, c, "P", Some(Decimal::from(10))).await.unwrap();
        ledger.record_dispatch(d).await.unwrap();
        ledger.record_receipt(c).await.unwrap();
        ledger.resolve_disputes().await.unwrap();
        ledger.seal_block().await.unwrap();
    }
    // Empty round still produces a block
    ledger.seal_block().await.unwrap();

    let chain = ledger.chain().await.unwrap();
    assert_eq!(chain.len(), 4);
    for pair in chain.windows(2) {
        assert_eq!(pair[1].previous_digest(), Some(pair[0].digest()));
    }
    assert_eq!(ledger.latest_block().await.unwrap().digest(), chain[3].digest());
    ledger.verify_chain().await.unwrap();

    let snapshot = ledger.snapshot("D2", "C2").await.unwrap().unwrap();
    assert_eq!(snapshot.status, TransactionStatus::Confirmed);
    let text = snapshot.to_text();
    assert!(text.contains("Manufacturer: Manufacturer_A"));
    assert!(text.contains("Distributor: D2"));
    assert!(text.contains("Client: C2"));

    ledger.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_overflowing_amounts_keep_ledger_serving() {
    let ledger = setup().await;
    ledger.register_node("N1", Decimal::MAX).await.unwrap();
    ledger.register_distributor("D9", Decimal::MIN).await.unwrap();

    assert!(matches!(
        ledger.seal_block().await,
        Err(Error::InvalidAmount(_))
    ));
    assert_eq!(ledger.chain().await.unwrap().len(), 1);

    ledger.submit("D9", "C1", "P-9", Some(Decimal::from(10))).await.unwrap();
    assert!(matches!(
        ledger.resolve_disputes().await,
        Err(Error::InvalidAmount(_))
    ));

    // The actor is still alive and nothing was lost
    let pending = ledger.pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].status(), TransactionStatus::Created);
    let balances = ledger.balances().await.unwrap();
    assert_eq!(balances.distributors["D9"], Decimal::MIN);
    assert_eq!(balances.validators, vec![("N1".to_string(), Decimal::MAX)]);
    ledger.verify_chain().await.unwrap();

    ledger.shutdown().await.unwrap();
}
