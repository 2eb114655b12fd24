use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = summa_cli::Args::parse();

	summa_worker::run(args).await
}
