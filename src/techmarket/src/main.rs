fn main() -> anyhow::Result<()> {
    techmarket_kiosk::main()
}
