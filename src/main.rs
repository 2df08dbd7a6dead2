use anyhow::Result;
use clap::Parser;
use log::{debug, error, info, warn};
use rust_decimal::prelude::*;
use std::time::Duration;

use tesseract_dashboard::config::{self, Config};
use tesseract_dashboard::model::*;
use tesseract_dashboard::router::{navigation_items, Navigation};
use tesseract_dashboard::store::{Dashboard, Environment};

const SAMPLE_ROUTES: [&str; 6] = ["/", "/portfolio", "/transactions?type=invest", "/admin", "/login", "/bots/bot_001/configure"];

#[derive(Parser)]
#[command(name = "tesseract-dashboard")]
#[command(about = "Tesseract Fund dashboard state core running on mock data")]
struct Args {
    #[arg(long)]
    generate_config: bool,

    #[arg(short, long)]
    config: Option<String>,

    #[arg(long)]
    debug: bool,

    /// metamask, walletconnect or coinbase
    #[arg(long, default_value = "metamask")]
    wallet: WalletProvider,

    /// Refresh cycles to run before exiting; 0 runs until Ctrl-C.
    #[arg(long, default_value_t = 0)]
    cycles: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    print_startup_banner();

    if args.generate_config {
        config::generate_sample_config()?;
        println!("✅ Sample configuration generated at config.toml");
        return Ok(());
    }

    let config = config::load_config(args.config.as_deref())?;

    run_dashboard(config, args.wallet, args.cycles).await
}

pub fn print_startup_banner() {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                   TESSERACT FUND DASHBOARD                   ║");
    println!("║                                                              ║");
    println!("║        Tokenized Fund Positions, Dividends & Strategies      ║");
    println!("║                                                              ║");
    println!("║   Stores: Session | Fund | Positions | Trading Bots | Guard  ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

async fn run_dashboard(config: Config, wallet: WalletProvider, cycles: u32) -> Result<()> {
    info!(
        "🚀 Starting dashboard (wallet: {}, refresh: {}ms, cycles: {})",
        wallet, config.refresh_interval_ms, cycles
    );

    let dashboard = Dashboard::new(&config, Environment::from_config(&config));

    if !dashboard.session.restore_session().await {
        dashboard.session.connect(wallet).await?;
    }

    tokio::try_join!(
        dashboard.fund.load_fund_data(),
        dashboard.positions.load_user_data(),
        dashboard.trading.load_trading_data(),
    )?;

    walk_routes(&dashboard).await;
    print_summary(&dashboard).await;

    refresh_loop(&dashboard, &config, cycles).await;

    info!("👋 Dashboard stopped");
    Ok(())
}

async fn walk_routes(dashboard: &Dashboard) {
    let role = dashboard.session.user_role().await;
    let menu: Vec<&str> = navigation_items(role).iter().map(|item| item.name).collect();
    info!("🧭 Navigation for {}: {}", role, menu.join(" | "));

    for path in SAMPLE_ROUTES {
        match dashboard.guard.before_each(path).await {
            Navigation::Proceed(route) => {
                println!("  {:<32} ✅ {} ({})", path, route.name, route.meta.title);
            }
            Navigation::Redirect { to, location, .. } => {
                println!("  {:<32} ↪️  {} ({})", path, to, location);
            }
        }
    }
    println!();
}

async fn print_summary(dashboard: &Dashboard) {
    let fund = &dashboard.fund;
    let positions = &dashboard.positions;
    let trading = &dashboard.trading;

    let performance = positions.investment_performance().await;
    let stats = trading.aggregated_stats(StatsPeriod::Day).await;

    println!("📈 Share price:        ${:.2}", fund.share_price().await);
    println!("🏦 NAV per share:      ${:.2}", fund.nav_per_share().await);
    println!(
        "💼 Portfolio value:    ${:.2} ({:+.2}% on ${:.2} invested)",
        positions.total_portfolio_value().await,
        performance.return_percent,
        performance.total_invested
    );
    println!("💎 Dividends earned:   ${:.2}", positions.total_dividends_earned().await);
    println!("📅 Next dividend est.: ${:.2}", positions.estimated_next_dividend().await);
    println!(
        "🤖 Bots:               {}/{} active, 24h profit ${:.2}, win rate {:.1}%",
        stats.active_bots, stats.total_bots, stats.total_profit, stats.average_win_rate
    );

    for position in positions.portfolio_allocation().await {
        debug!(
            "   {:<6} {:>5}%  ${:.2}",
            position.symbol, position.allocation, position.user_value
        );
    }
    println!();
}

async fn refresh_loop(dashboard: &Dashboard, config: &Config, cycles: u32) {
    let mut interval = tokio::time::interval(Duration::from_millis(config.refresh_interval_ms));
    let mut update_counter: u32 = 0;
    let mut failures = FailureStreak::default();

    info!("📡 Starting refresh loop (interval: {}ms)", config.refresh_interval_ms);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("🛑 Ctrl-C received, shutting down");
                break;
            }
        }
        update_counter += 1;

        match refresh_cycle(dashboard).await {
            Ok(()) => {
                failures.reset();
                info!(
                    "📊 Update #{} - share: ${:.2}, AUM: ${:.1}M, portfolio: ${:.2}, bots 24h: ${:.2}",
                    update_counter,
                    dashboard.fund.share_price().await,
                    dashboard.fund.snapshot().await.data.total_aum.to_f64().unwrap_or(0.0) / 1_000_000.0,
                    dashboard.positions.total_portfolio_value().await,
                    dashboard.trading.total_profit_24h().await
                );
            }
            Err(e) => {
                error!("❌ Refresh cycle #{} failed: {}", update_counter, e);
                if let Some(streak) = failures.record_failure() {
                    warn!("⚠️ Refresh has failed {} cycles in a row", streak);
                }
            }
        }

        if cycles > 0 && update_counter >= cycles {
            break;
        }
    }
}

/// Consecutive refresh failures, warned about every fifth one.
#[derive(Default)]
struct FailureStreak {
    count: u32,
}

impl FailureStreak {
    const WARN_EVERY: u32 = 5;

    fn reset(&mut self) {
        self.count = 0;
    }

    fn record_failure(&mut self) -> Option<u32> {
        self.count += 1;
        (self.count % Self::WARN_EVERY == 0).then_some(self.count)
    }
}

async fn refresh_cycle(dashboard: &Dashboard) -> Result<()> {
    dashboard.fund.refresh().await?;
    dashboard.positions.refresh_balances().await?;
    dashboard.trading.update_bot_metrics().await;

    if let Some(bot) = dashboard.trading.best_performing_bot().await {
        if bot.status == BotStatus::Active {
            let trade = dashboard.trading.record_trade(&bot.id).await?;
            debug!("🤖 {} {:?} {} {} @ {}", bot.name, trade.side, trade.amount, trade.pair, trade.price);
        }
    }

    Ok(())
}
