use clap::Parser;

use pulse::cli::{self, Args, Commands};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let result = match args.command {
        Commands::Record {
            user_a,
            user_b,
            kind,
            content,
            data_dir,
        } => cli::handle_record(user_a, user_b, kind, content, data_dir).await,
        Commands::Status {
            user_a,
            user_b,
            format,
            data_dir,
        } => cli::handle_status(user_a, user_b, format, data_dir).await,
        Commands::List { user_id, data_dir } => cli::handle_list(user_id, data_dir).await,
        Commands::Stats { data_dir } => cli::handle_stats(data_dir).await,
        Commands::Watch {
            user_a,
            user_b,
            data_dir,
        } => cli::handle_watch(user_a, user_b, data_dir).await,
    };

    if let Err(e) = result {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}
