use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use vipcoin_core::{
    constants::{DEFAULT_DIFFICULTY, DEFAULT_MINING_REWARD},
    Block, Chain, ChainConfig, MiningStrategy, Transaction,
};

#[derive(Parser, Debug)]
#[command(name = "vipcoin")]
#[command(about = "Mine, tamper with and audit an in-memory proof-of-work ledger")]
struct Cli {
    #[command(flatten)]
    chain: ChainArgs,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug)]
struct ChainArgs {
    /// Leading hex zeros required of a mined block hash
    #[arg(long, global = true, default_value_t = DEFAULT_DIFFICULTY)]
    difficulty: u32,

    /// Reward paid to the miner of a ledger commit
    #[arg(long, global = true, default_value_t = DEFAULT_MINING_REWARD)]
    reward: i64,

    /// Search nonces on all cores
    #[arg(long, global = true)]
    parallel: bool,

    /// Append blocks without mining them
    #[arg(long, global = true)]
    no_pow: bool,
}

impl ChainArgs {
    fn config(&self) -> Result<ChainConfig> {
        let strategy = if self.parallel {
            MiningStrategy::Parallel
        } else {
            MiningStrategy::Sequential
        };
        let config = ChainConfig::default()
            .with_difficulty(self.difficulty)
            .with_mining_reward(self.reward)
            .with_proof_of_work(!self.no_pow)
            .with_strategy(strategy);
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine two blocks and check the chain
    Demo {
        /// Print the resulting chain as JSON
        #[arg(long)]
        dump: bool,
    },
    /// Rewrite a mined block and show that validation notices
    Tamper,
    /// Queue transfers, commit them and print balances
    Ledger {
        /// Address that receives mining rewards
        #[arg(long, default_value = "miner")]
        miner: String,
        /// Transfer as FROM:TO:AMOUNT, repeatable
        #[arg(long = "transfer", value_parser = parse_transfer)]
        transfers: Vec<Transaction>,
        /// Number of commits; the reward of the last one stays pending
        #[arg(long, default_value_t = 2)]
        rounds: u32,
    },
}

fn parse_transfer(raw: &str) -> Result<Transaction, String> {
    let mut parts = raw.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(from), Some(to), Some(amount)) if !from.is_empty() && !to.is_empty() => {
            let amount = amount
                .parse::<i64>()
                .map_err(|e| format!("invalid amount {amount:?}: {e}"))?;
            Ok(Transaction::new(from, to, amount))
        }
        _ => Err(format!("expected FROM:TO:AMOUNT, got {raw:?}")),
    }
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.chain.config()?;
    match cli.cmd {
        Command::Demo { dump } => demo(config, dump),
        Command::Tamper => tamper(config),
        Command::Ledger {
            miner,
            transfers,
            rounds,
        } => ledger(config, &miner, transfers, rounds),
    }
}

fn demo_chain(config: ChainConfig) -> Chain {
    let mut chain = Chain::with_config(config);

    println!("Mining Block 1....");
    chain.add_block(Block::new(Some(1), "02/20/2018", json!({ "amount": 4 })));

    println!("Mining Block 2....");
    chain.add_block(Block::new(Some(2), "02/22/2018", json!({ "amount": 10 })));

    chain
}

fn demo(config: ChainConfig, dump: bool) -> Result<()> {
    let chain = demo_chain(config);
    println!("Is blockchain valid? {}", chain.is_chain_valid());
    if dump {
        println!("{}", serde_json::to_string_pretty(&chain)?);
    }
    Ok(())
}

fn tamper(config: ChainConfig) -> Result<()> {
    let mut chain = demo_chain(config);
    println!("Is blockchain valid? {}", chain.is_chain_valid());

    println!("Rewriting block 1 data to {{\"amount\":100}}");
    chain.blocks_mut()[1].payload = json!({ "amount": 100 }).into();
    report(&chain);

    println!("Recomputing block 1 hash");
    chain.blocks_mut()[1].recompute_hash();
    report(&chain);

    if chain.is_chain_valid() {
        bail!("tampered chain passed validation");
    }
    Ok(())
}

fn report(chain: &Chain) {
    match chain.verify() {
        Ok(()) => println!("Is blockchain valid? true"),
        Err(err) => println!("Is blockchain valid? false ({err})"),
    }
}

fn ledger(
    config: ChainConfig,
    miner: &str,
    transfers: Vec<Transaction>,
    rounds: u32,
) -> Result<()> {
    let mut chain = Chain::with_config(config);
    let mut addresses: Vec<String> = Vec::new();
    for tx in transfers {
        for address in tx.from_address.iter().chain([&tx.to_address]) {
            if !addresses.contains(address) {
                addresses.push(address.clone());
            }
        }
        chain.create_transaction(tx);
    }
    if !addresses.iter().any(|a| a == miner) {
        addresses.push(miner.to_string());
    }

    for round in 1..=rounds {
        println!("Starting the miner (round {round})...");
        let block = chain.mine_pending_transactions(miner);
        info!(
            "committed {} transactions in block {}",
            block.transactions().len(),
            block.hash
        );
    }

    for address in &addresses {
        println!("Balance of {address} is {}", chain.balance_of_address(address));
    }
    println!("Is blockchain valid? {}", chain.is_chain_valid());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_transfer_example() {
        assert_eq!(parse_transfer("A:B:100"), Ok(Transaction::new("A", "B", 100)));
        assert_eq!(parse_transfer("A:B:-5"), Ok(Transaction::new("A", "B", -5)));
        assert!(parse_transfer("A:B").is_err());
        assert!(parse_transfer(":B:1").is_err());
        assert!(parse_transfer("A:B:lots").is_err());
    }

    #[test]
    fn cli_rejects_unreachable_difficulty() {
        let cli = Cli::try_parse_from(["vipcoin", "--difficulty", "65", "demo"]).unwrap();
        assert!(cli.chain.config().is_err());
    }
}
