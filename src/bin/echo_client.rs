use std::{cell::RefCell, error::Error, process, rc::Rc, time::Duration};

use clap::{Parser, ValueEnum};
use log::{error, info, trace};
use msgbox::{Data, Event, Reactor, bytes_to_string};

const MSG_CONTENT: &str = "xxx";
const REQUEST_CONTENT: &str = "yyy";

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Transport {
    Tcp,
    Udp,
}

/// Talks to echo_server: sends a message, then a request for every echo, reconnecting after
/// each reply until enough bytes came back.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Protocol to connect with
    protocol: Transport,
    /// Server port; defaults to 2345 for tcp and 2468 for udp
    #[arg(long)]
    port: Option<u16>,
    /// Stop once this many payload bytes were received
    #[arg(long, default_value_t = 1024)]
    max_bytes: u64,
    /// Longest wait of a single reactor tick, in milliseconds
    #[arg(long, default_value_t = 10)]
    timeout_ms: u64,
}

#[derive(Default)]
struct ClientState {
    connected: bool,
    received: u64,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let (scheme, default_port) = match cli.protocol {
        Transport::Tcp => ("tcp", 2345),
        Transport::Udp => ("udp", 2468),
    };
    let address = format!("{scheme}://127.0.0.1:{}", cli.port.unwrap_or(default_port));
    let timeout = Duration::from_millis(cli.timeout_ms);
    let pid = process::id();

    let state = Rc::new(RefCell::new(ClientState::default()));
    let mut reactor: Reactor<(), &'static str> = Reactor::new();

    trace!("Client: connecting to address {address}");
    while state.borrow().received < cli.max_bytes {
        if !state.borrow().connected {
            let callback_state = Rc::clone(&state);
            let connecting = reactor.connect(&address, (), move |reactor, conn, event, data| {
                let mut state = callback_state.borrow_mut();
                info!(
                    "<{pid}> Client: received event {event}. {} recvd",
                    bytes_to_string(state.received)
                );

                let sent = match event {
                    Event::ConnectionReady => {
                        state.connected = true;
                        reactor.send(conn.id, &mut Data::from_text(MSG_CONTENT))
                    }
                    Event::Message => {
                        state.received += data.as_str().len() as u64;
                        info!("Client: message is '{}'.", data.as_str());
                        let mut request = Data::from_text(REQUEST_CONTENT);
                        reactor.request(conn.id, &mut request, REQUEST_CONTENT)
                    }
                    Event::Reply => {
                        state.received += data.as_str().len() as u64;
                        info!(
                            "Client: reply is '{}'; reply_context: '{}'.",
                            data.as_str(),
                            conn.reply_context.unwrap_or("<none>")
                        );
                        reactor.disconnect(conn.id)
                    }
                    Event::ConnectionClosed | Event::ConnectionLost => {
                        state.connected = false;
                        Ok(())
                    }
                    Event::Error => {
                        error!("Client: error: {}.", data.as_str());
                        Ok(())
                    }
                    _ => Ok(()),
                };

                if let Err(err) = sent {
                    error!("Client: {err}");
                }
            });

            // Count a pending connection as connected until its callback says otherwise.
            state.borrow_mut().connected = connecting.is_some();
        }

        reactor.tick(timeout);
    }

    info!(
        "exiting after {} received",
        bytes_to_string(state.borrow().received)
    );
    Ok(())
}
