fn main() -> anyhow::Result<()> {
    rosterspin_cui::init_file_logging()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    rosterspin_cui::run_with_args(&args)
}
