fn main() -> std::process::ExitCode {
    packsync_lib::run()
}
