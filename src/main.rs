/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use clap::{error::ErrorKind, Parser};
use newt::{Engine, EngineCommand};
use uci_parser::UciCommand;

fn main() {
    let mut engine = Engine::new();

    // Skip the executable name
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    // Consume the longest prefix of the remaining arguments that forms a command, repeatedly
    let mut arg_idx = args.len();
    let mut parsed_idx = 0;
    while parsed_idx < arg_idx {
        let slice = &args[parsed_idx..arg_idx];

        let cmd = match EngineCommand::try_parse_from(slice) {
            Ok(cmd) => Some(cmd),

            // `--help` and `--version` are both "error" cases according to Clap
            Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                println!("{e}");
                None
            }

            Err(e) => match UciCommand::new(&slice.join(" ")) {
                Ok(cmd) => Some(EngineCommand::Uci { cmd }),
                Err(_) if arg_idx > parsed_idx + 1 => {
                    arg_idx -= 1;
                    continue;
                }
                Err(_) => {
                    eprintln!("Error on input {slice:?}:\n{e}");
                    None
                }
            },
        };

        if let Some(cmd) = cmd {
            if let Err(e) = engine.send_command(cmd) {
                eprintln!("{e:#}");
            }
        }

        parsed_idx = arg_idx;
        arg_idx = args.len();
    }

    engine.run();
}
