fn main() -> std::process::ExitCode {
    nenofex::shell::main()
}
