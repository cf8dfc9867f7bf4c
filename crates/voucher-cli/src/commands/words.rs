//! Words command - print an amount in words.

use clap::Args;

use voucher_core::mapping::amount_to_words;

#[derive(Args)]
pub struct WordsArgs {
    /// Amount, e.g. "1,500.50" or "₹ 250"
    #[arg(required = true, allow_hyphen_values = true)]
    amount: String,
}

pub async fn run(args: WordsArgs) -> anyhow::Result<()> {
    println!("{}", amount_to_words(&args.amount));
    Ok(())
}
