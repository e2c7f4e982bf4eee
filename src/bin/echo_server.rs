use std::{
    cell::Cell,
    error::Error,
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use clap::{Parser, ValueEnum};
use log::{debug, error, info, trace};
use msgbox::{Data, Event, Reactor};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Transport {
    Tcp,
    Udp,
}

/// Echoes every message back as `echo:<payload>` and answers requests with replies.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Protocol to listen with
    protocol: Transport,
    /// Port to listen on; defaults to 2345 for tcp and 2468 for udp
    #[arg(long)]
    port: Option<u16>,
    /// Longest wait of a single reactor tick, in milliseconds
    #[arg(long, default_value_t = 10)]
    timeout_ms: u64,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let (scheme, default_port) = match cli.protocol {
        Transport::Tcp => ("tcp", 2345),
        Transport::Udp => ("udp", 2468),
    };
    let address = format!("{scheme}://*:{}", cli.port.unwrap_or(default_port));
    let timeout = Duration::from_millis(cli.timeout_ms);

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))?;

    let listening_ended = Rc::new(Cell::new(false));
    let ended = Rc::clone(&listening_ended);

    let mut reactor: Reactor = Reactor::new();
    info!("Server: listening at address {address}");
    let Some(listener) = reactor.listen(&address, (), move |reactor, conn, event, data| {
        trace!("Server: received event {event}.");

        match event {
            Event::Error => error!("Server: error: {}.", data.as_str()),
            Event::Listening => info!("Listening......."),
            Event::Message | Event::Request => {
                debug!("Server: {event} is '{}'.", data.as_str());
                let mut out = Data::from_text(&format!("echo:{}", data.as_str()));
                let sent = if event == Event::Request {
                    reactor.reply(conn.id, &mut out)
                } else {
                    reactor.send(conn.id, &mut out)
                };
                if let Err(err) = sent {
                    error!("Server: {err}");
                }
            }
            Event::ConnectionLost | Event::ConnectionClosed => {
                info!(
                    "Server: connection from {}:{} ended",
                    conn.remote_address, conn.remote_port
                );
            }
            Event::ListeningEnded => ended.set(true),
            _ => {}
        }
    }) else {
        // The error event still has to be delivered before exiting.
        reactor.tick(Duration::ZERO);
        return Err(format!("could not listen at {address}").into());
    };

    while running.load(Ordering::SeqCst) {
        reactor.tick(timeout);
    }

    reactor.unlisten(listener)?;
    // Give the reactor a chance to deliver the listening-ended event.
    reactor.tick(timeout);
    if listening_ended.get() {
        info!("Server: stopped");
    }

    Ok(())
}
