use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("ledpipe {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: ledpipe");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("build_target: {}", option_env!("LEDPIPE_BUILD_TARGET").unwrap_or("unknown"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "features: mock={}, cli=true, serial={}",
        cfg!(feature = "mock"),
        cfg!(unix)
    );

    Ok(SUCCESS)
}
