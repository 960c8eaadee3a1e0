//! Spot trading simulation demo.
//!
//! Seeds a market, lets the feed run for a moment, then walks through the
//! order-entry paths: book-matched market and limit orders, a quick trade, a
//! swap, earn accrual and a snapshot round trip.
//!
//! `RUST_LOG=debug cargo run` shows every tick and fill.

use std::error::Error;
use std::time::Duration;

use rust_decimal_macros::dec;
use spot_sim_core::simulator::driver;
use spot_sim_core::*;

type DemoResult = Result<(), Box<dyn Error>>;

fn main() -> DemoResult {
    env_logger::init();

    println!("Spot Trading Simulation");
    println!("Synthetic feed, local matching, no real funds\n");

    let config = Environment::Development.config();
    config.validate()?;

    let snapshot = create_seed("USDT", None);
    scenario_1_seeded_market(&snapshot);
    let market = scenario_2_live_feed(snapshot.market.clone(), &config)?;

    let mut engine = MatchingEngine::new(EngineConfig::from(&config))?;
    let mut portfolio = snapshot.portfolio.clone();
    let mut orders = OrdersState::default();

    scenario_3_market_buy(&mut engine, &market, &mut portfolio, &mut orders)?;
    scenario_4_resting_limit(&mut engine, &market, &mut portfolio, &mut orders)?;
    scenario_5_quick_trade(&mut engine, &market, &mut portfolio, &mut orders)?;
    scenario_6_swap(&mut engine, &market, &mut portfolio, &mut orders)?;
    scenario_7_earn();
    scenario_8_snapshot(SimulationSnapshot {
        market,
        portfolio,
        orders,
        ..snapshot
    })?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

fn scenario_1_seeded_market(snapshot: &SimulationSnapshot) {
    println!("Scenario 1: Seeded Market\n");

    for pair in &snapshot.market.pairs {
        if let Some(ticker) = snapshot.market.ticker(&pair.symbol) {
            println!(
                "  {:<9} last {:>12}  24h {:>6}%  vol {}",
                pair.symbol, ticker.last_price, ticker.price_change_percent, ticker.volume
            );
        }
    }
    println!(
        "\n  Portfolio value: {} {} across {} assets\n",
        snapshot.portfolio.total_value.round_dp(2),
        snapshot.portfolio.base_currency,
        snapshot.portfolio.assets.len()
    );
}

fn scenario_2_live_feed(market: MarketState, config: &SimulationConfig) -> Result<MarketState, Box<dyn Error>> {
    println!("Scenario 2: Live Feed at 20x\n");

    let mut sim = MarketSimulator::new(market, config.clone())?;
    sim.on(EventKind::Trade, |event| {
        if let SimulatorEvent::Trade(fill) = event {
            if fill.symbol == "BTCUSDT" {
                println!("  tape {} {} {} @ {}", fill.symbol, fill.side, fill.quantity, fill.price);
            }
        }
    });

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let ticks = runtime.block_on(async {
        let (handle, commands) = driver::channel();
        handle.set_speed(SimulationSpeed::Turbo)?;
        handle.start()?;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1_300)).await;
            let _ = handle.shutdown();
        });
        Ok::<_, SimulatorError>(driver::run(&mut sim, commands).await)
    })?;

    println!("\n  {} ticks at {:?} per tick\n", ticks, sim.tick_interval());
    Ok(sim.into_state())
}

fn submit(
    engine: &mut MatchingEngine,
    mode: ExecutionMode,
    draft: &OrderDraft,
    market: &MarketState,
    portfolio: &mut PortfolioState,
    orders: &mut OrdersState,
) -> Result<ExecutionReport, EngineError> {
    let report = {
        let ctx = MatchContext::from_market(market, &draft.symbol, portfolio, Timestamp::now())?;
        engine.execute(mode, draft, &ctx)?
    };
    orders.record(&report);
    *portfolio = report.updated_portfolio.clone();
    Ok(report)
}

fn print_report(report: &ExecutionReport) {
    println!(
        "  {} {} {} {}: {:?}, filled {} in {} fills, fees {}",
        report.order.id,
        report.order.side,
        report.order.quantity,
        report.order.symbol,
        report.order.status,
        report.filled_quantity(),
        report.fills.len(),
        report.fees()
    );
    if let Some(avg) = report.order.avg_price {
        println!("  average price {}", avg);
    }
}

fn scenario_3_market_buy(
    engine: &mut MatchingEngine,
    market: &MarketState,
    portfolio: &mut PortfolioState,
    orders: &mut OrdersState,
) -> DemoResult {
    println!("Scenario 3: Book-Matched Market Buy\n");

    let usdt_before = portfolio.free("USDT");
    let draft = OrderDraft::market("BTCUSDT", Side::Buy, dec!(0.01));
    let report = submit(engine, ExecutionMode::BookMatch, &draft, market, portfolio, orders)?;
    print_report(&report);
    println!(
        "  USDT {} -> {}, BTC now {}\n",
        usdt_before,
        portfolio.free("USDT"),
        portfolio.free("BTC")
    );
    Ok(())
}

fn scenario_4_resting_limit(
    engine: &mut MatchingEngine,
    market: &MarketState,
    portfolio: &mut PortfolioState,
    orders: &mut OrdersState,
) -> DemoResult {
    println!("Scenario 4: Resting Limit Order\n");

    let Some(best_bid) = market.order_book("ETHUSDT").and_then(|b| b.best_bid()).map(|l| l.price) else {
        println!("  no ETH bids, skipping\n");
        return Ok(());
    };
    let price = (best_bid * dec!(0.95)).round_dp(2);
    let draft = OrderDraft::limit("ETHUSDT", Side::Buy, dec!(0.1), price);
    let report = submit(engine, ExecutionMode::BookMatch, &draft, market, portfolio, orders)?;
    print_report(&report);
    println!("  open orders: {}", orders.open_orders.len());

    let cancelled = orders.cancel(report.order.id, Timestamp::now())?;
    println!("  cancelled {}: {:?}\n", cancelled.id, cancelled.status);
    Ok(())
}

fn scenario_5_quick_trade(
    engine: &mut MatchingEngine,
    market: &MarketState,
    portfolio: &mut PortfolioState,
    orders: &mut OrdersState,
) -> DemoResult {
    println!("Scenario 5: Quick Trade\n");

    let draft = OrderDraft::quick("SOLUSDT", Side::Buy, dec!(250));
    let report = submit(engine, ExecutionMode::QuickTrade, &draft, market, portfolio, orders)?;
    print_report(&report);
    if let Some(slippage) = report.slippage {
        println!("  slippage {}%\n", (slippage * dec!(100)).round_dp(4));
    }
    Ok(())
}

fn scenario_6_swap(
    engine: &mut MatchingEngine,
    market: &MarketState,
    portfolio: &mut PortfolioState,
    orders: &mut OrdersState,
) -> DemoResult {
    println!("Scenario 6: Swap DOGE into USDT\n");

    let report = {
        let ctx = MatchContext::from_market(market, "DOGEUSDT", portfolio, Timestamp::now())?;
        engine.swap("DOGE", "USDT", dec!(1000), &ctx)?
    };
    orders.record(&report);
    *portfolio = report.updated_portfolio.clone();
    print_report(&report);
    println!(
        "  DOGE {}, USDT {}, trades on record {}\n",
        portfolio.free("DOGE"),
        portfolio.free("USDT"),
        orders.trade_history.len()
    );
    Ok(())
}

fn scenario_7_earn() {
    println!("Scenario 7: Earn Accrual at 20x\n");

    let products = seed_earn_products();
    let start = Timestamp::now();
    let positions: Vec<EarnPosition> = products
        .iter()
        .map(|product| EarnPosition::open(product, dec!(100), start))
        .collect();

    let week_later = start.plus_millis(7 * 86_400_000);
    for position in accrue_yield(&positions, &products, week_later, SimulationSpeed::Turbo.as_decimal()) {
        println!("  {:<14} reward {}", position.product_id, position.accrued_reward);
    }
    println!();
}

fn scenario_8_snapshot(snapshot: SimulationSnapshot) -> DemoResult {
    println!("Scenario 8: Snapshot Round Trip\n");

    let json = snapshot.to_json()?;
    let restored = SimulationSnapshot::restore_or_seed(Some(&json), "USDT");
    println!("  {} bytes, portfolio value {}", json.len(), restored.portfolio.total_value.round_dp(2));
    println!("  history: {} orders, {} trades", restored.orders.order_history.len(), restored.orders.trade_history.len());
    Ok(())
}
