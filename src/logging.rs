use log::LevelFilter;

/// Installs the stdout logger. rodbus is capped at `Info` so that frame
/// level chatter does not drown the daemon's own messages.
pub fn setup(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        .level_for("rodbus", level.min(LevelFilter::Info))
        .chain(std::io::stdout())
        .apply()
}
