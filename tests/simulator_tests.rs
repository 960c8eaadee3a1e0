//! Simulator tests
//!
//! Drive a seeded market through the feed and the tokio driver, then trade
//! against what the feed produced.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use spot_sim_core::simulator::driver;
use spot_sim_core::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

const NOW: i64 = 1_700_000_000_000;

fn seeded(seed: u64) -> SimulationSnapshot {
    let mut rng = StdRng::seed_from_u64(seed);
    create_seed_with(&mut rng, "USDT", Timestamp::from_millis(NOW), &SimulationConfig::default()).unwrap()
}

fn simulator(snapshot: &SimulationSnapshot) -> MarketSimulator<StdRng> {
    MarketSimulator::with_rng(snapshot.market.clone(), SimulationConfig::default(), StdRng::seed_from_u64(42)).unwrap()
}

mod feed_tests {
    use super::*;

    #[test]
    fn pairs_are_updated_in_catalog_order() {
        let snapshot = seeded(1);
        let mut sim = simulator(&snapshot);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        sim.on(EventKind::Ticker, move |event| {
            if let SimulatorEvent::Ticker(ticker) = event {
                sink.borrow_mut().push(ticker.symbol.clone());
            }
        });

        sim.tick(Timestamp::from_millis(NOW + 1_000));

        let expected: Vec<String> = snapshot.market.pairs.iter().map(|p| p.symbol.clone()).collect();
        assert_eq!(*seen.borrow(), expected);
    }

    #[test]
    fn once_listener_sees_only_first_depth() {
        let snapshot = seeded(2);
        let mut sim = simulator(&snapshot);
        let depths = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&depths);
        sim.once(EventKind::Depth, move |_| *counter.borrow_mut() += 1);

        sim.tick(Timestamp::from_millis(NOW + 1_000));
        sim.tick(Timestamp::from_millis(NOW + 2_000));
        assert_eq!(*depths.borrow(), 1);
    }

    #[test]
    fn candles_extend_within_bucket_and_roll_after() {
        let snapshot = seeded(3);
        let mut sim = simulator(&snapshot);
        let before = snapshot.market.candles("BTCUSDT", CandleInterval::OneMinute).unwrap().clone();
        let last_open = before.back().unwrap().open_time;

        // same minute as the last seeded sample
        sim.tick(last_open.plus_millis(30_000));
        let series = sim.state().candles("BTCUSDT", CandleInterval::OneMinute).unwrap();
        assert_eq!(series.len(), before.len());
        assert_eq!(series.back().unwrap().open_time, last_open);

        // next minute opens a new candle, oldest evicted at the cap
        sim.tick(last_open.plus_millis(60_000));
        let series = sim.state().candles("BTCUSDT", CandleInterval::OneMinute).unwrap();
        assert_eq!(series.len(), before.len());
        assert_eq!(series.back().unwrap().open_time, last_open.plus_millis(60_000));
        assert_eq!(series.front().unwrap().open_time, before[1].open_time);
    }

    #[test]
    fn portfolio_revalues_against_moved_prices() {
        let snapshot = seeded(4);
        let mut sim = simulator(&snapshot);
        for i in 1..=20 {
            sim.tick(Timestamp::from_millis(NOW + i * 1_000));
        }

        let mut portfolio = snapshot.portfolio.clone();
        let value = portfolio.revalue(&sim.state().price_map);
        assert_eq!(value, portfolio.valuation(&sim.state().price_map));
        assert!(value > Decimal::ZERO);

        let pnl = portfolio.pnl_24h(sim.state());
        assert!(pnl.iter().any(|p| p.symbol == "BTC"));
        assert!(pnl.iter().all(|p| p.symbol != "USDT"));
    }
}

mod driver_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn stop_pauses_and_start_resumes() {
        let snapshot = seeded(5);
        let mut sim = simulator(&snapshot);
        let (handle, rx) = driver::channel();

        let control = handle.clone();
        handle.start().unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2_500)).await;
            control.stop().unwrap();
            tokio::time::sleep(Duration::from_millis(10_000)).await;
            control.start().unwrap();
            tokio::time::sleep(Duration::from_millis(1_500)).await;
            control.shutdown().unwrap();
        });
        drop(handle);

        // 1000, 2000 before the stop; 13500 after the restart
        assert_eq!(driver::run(&mut sim, rx).await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn status_events_follow_commands() {
        let snapshot = seeded(6);
        let mut sim = simulator(&snapshot);
        let statuses = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&statuses);
        sim.on(EventKind::Status, move |event| {
            if let SimulatorEvent::Status(status) = event {
                sink.borrow_mut().push((status.status, status.speed));
            }
        });

        let (handle, rx) = driver::channel();
        handle.start().unwrap();
        handle.start().unwrap();
        handle.set_speed(SimulationSpeed::Fast).unwrap();
        handle.shutdown().unwrap();
        driver::run(&mut sim, rx).await;

        assert_eq!(
            *statuses.borrow(),
            vec![
                (SimulatorStatus::Running, SimulationSpeed::Normal),
                (SimulatorStatus::Running, SimulationSpeed::Fast),
                (SimulatorStatus::Stopped, SimulationSpeed::Fast),
            ]
        );
    }
}

mod trading_on_live_data {
    use super::*;

    #[test]
    fn book_match_against_simulated_depth() {
        let snapshot = seeded(7);
        let mut sim = simulator(&snapshot);
        sim.tick(Timestamp::from_millis(NOW + 1_000));
        let market = sim.into_state();

        let shared = SharedPortfolio::new(snapshot.portfolio.clone());
        let mut matcher = BookMatcher::new(EngineConfig::default(), IdSequence::new());
        let report = shared
            .execute(
                &mut matcher,
                &OrderDraft::market("ETHUSDT", Side::Sell, dec!(1)),
                &market,
                Timestamp::from_millis(NOW + 1_500),
            )
            .unwrap();

        assert!(matches!(report.order.status, OrderStatus::Filled | OrderStatus::PartiallyFilled));
        let best_bid = market.order_book("ETHUSDT").unwrap().best_bid().unwrap().price;
        assert!(report.fills.iter().all(|f| f.price <= best_bid));

        let after = shared.snapshot();
        assert_eq!(after.free("ETH"), dec!(2.15) - report.filled_quantity());
        assert_eq!(after.equity_history.back().unwrap().timestamp, Timestamp::from_millis(NOW + 1_500));
    }

    #[test]
    fn snapshot_survives_a_session() {
        let snapshot = seeded(8);
        let mut sim = simulator(&snapshot);
        for i in 1..=3 {
            sim.tick(Timestamp::from_millis(NOW + i * 1_000));
        }

        let saved = SimulationSnapshot {
            market: sim.into_state(),
            ..snapshot
        };
        let json = saved.to_json().unwrap();
        let restored = SimulationSnapshot::restore_or_seed(Some(&json), "USDT");

        assert_eq!(restored.market.trades("BTCUSDT").unwrap().len(), 3);
        assert_eq!(restored.market.last_updated, Some(Timestamp::from_millis(NOW + 3_000)));
        assert_eq!(restored.portfolio, saved.portfolio);
    }
}
