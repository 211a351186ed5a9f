const VERSION: &str = env!("CARGO_PKG_VERSION");
const GIT_COMMIT: Option<&str> = option_env!("MIGR8_GIT_COMMIT");
const BUILD_TIME: Option<&str> = option_env!("MIGR8_BUILD_TIME");

pub fn run() {
    println!("migr8 Database Migration Tool");
    println!("Version:    {}", VERSION);
    println!("Git Commit: {}", GIT_COMMIT.unwrap_or("dev"));
    println!("Build Time: {}", BUILD_TIME.unwrap_or("unknown"));
    println!(
        "OS/Arch:    {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}
