fn main() -> Result<(), Box<dyn std::error::Error>> {
    jarvis_chat::cli::main()
}
