use std::io::Read;
use std::process::ExitCode;

use anyhow::Context;

fn main() -> ExitCode {
    let mut source = String::new();
    if let Err(error) = std::io::stdin()
        .read_to_string(&mut source)
        .context("failed to read source from standard input")
    {
        eprintln!("error: {:#}", error);
        return ExitCode::from(99);
    }

    match ifjc_drv::compile(&source) {
        Ok(assembly) => {
            print!("{}", assembly);
            ExitCode::SUCCESS
        }
        Err(diagnostic) => {
            eprintln!("{}", diagnostic);
            ExitCode::from(diagnostic.kind.exit_code() as u8)
        }
    }
}
