// Copyright (C) 2021  Anthony DeDominic <adedomin@gmail.com>

// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

mod config;
mod error;
mod expect;
mod format;
mod handlers;
mod irc;
mod pollloop;
mod schedule;
mod state;
mod transport;

use std::fs::OpenOptions;
use std::path::Path;

use config::cmdline::ParsedArgs;
use config::Config;
use error::MainError;
use state::Core;

fn init_logging(args: &ParsedArgs) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.timestamp_logs {
        builder.format_timestamp_secs();
    } else {
        builder.format_timestamp(None);
    }
    if !args.log_file.is_empty() {
        if let Ok(f) = OpenOptions::new().create(true).append(true).open(&args.log_file) {
            builder.target(env_logger::Target::Pipe(Box::new(f)));
        }
    }
    builder.init();
}

fn main() -> Result<(), MainError> {
    let args = ParsedArgs::new()?;
    init_logging(&args);

    let config_path = Path::new(&args.config);
    let config = Config::from_path(config_path)?;
    let mut core = Core::from_config(&config);

    pollloop::run(&mut core, &config, &config.def.quitmessage)?;
    Ok(())
}
