// src/main.rs
// Process frontend: line-delimited JSON requests on stdin, replies on stdout.

use std::io::{BufRead, BufWriter, Write};
use std::thread;

use rastercast::scene::PrefabHulls;
use rastercast::worker::{self, protocol::Request};

fn main() {
    env_logger::init();

    let handle = match worker::spawn(Box::new(PrefabHulls)) {
        Ok(handle) => handle,
        Err(err) => {
            log::error!("worker startup failed: {err}");
            std::process::exit(1);
        }
    };

    let (tx, rx, join) = handle.into_parts();

    let writer = thread::spawn(move || {
        let stdout = std::io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        while let Ok(reply) = rx.recv() {
            let Ok(serialized) = serde_json::to_string(&reply) else {
                continue;
            };
            if writeln!(out, "{serialized}").is_err() {
                break;
            }
            if out.flush().is_err() {
                break;
            }
        }
    });

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Request>(trimmed) {
            Ok(req) => {
                if tx.send(req).is_err() {
                    break;
                }
            }
            // Unknown methods and malformed payloads get no reply.
            Err(err) => log::warn!("dropping malformed command: {err}"),
        }
    }

    drop(tx);
    let _ = join.join();
    let _ = writer.join();
}
