//! List strategies command.

use anyhow::Result;
use backtest_strategies::StrategyRegistry;

pub fn run() -> Result<()> {
    let registry = StrategyRegistry::new();

    println!("Available Strategies");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    for info in registry.list() {
        println!("  {} ({})", info.name, info.key);
        println!("  ───────────────────────────────────────────────────────");
        println!("  {}", info.description);
        println!();
        println!("  Default parameters:");
        for line in serde_json::to_string_pretty(&info.default_config)?.lines() {
            println!("    {}", line);
        }
        println!();
    }

    println!("Use --strategy <key> to select a strategy.");
    println!();
    let keys: Vec<&str> = registry.names().into_iter().map(String::as_str).collect();
    println!("Strategy keys: {}", keys.join(", "));

    Ok(())
}
