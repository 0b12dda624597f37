fn main() {
    kickoff::app::cli::run();
}
