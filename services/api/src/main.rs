use tier_board_api::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("tier-board: {err}");
        std::process::exit(1);
    }
}
