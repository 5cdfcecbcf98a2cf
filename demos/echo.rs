//! Echo Peer - simple pull/push example over TCP.
//!
//! This example demonstrates:
//! - Creating a peer with the builder pattern
//! - Registering a pull handler with typed input/output
//! - Reading the query string and the remote address from the context
//! - Switching the reply codec per exchange
//!
//! # Running
//!
//! ```text
//! cargo run --example echo -- 127.0.0.1:7070
//! ```
//!
//! Requests to `/echo?upper=1` upper-case the message; requests to
//! `/echo/msgpack` get a MessagePack reply whatever codec they arrived in.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use wirecall::{Context, Peer};

/// Input structure for the echo handler.
#[derive(Deserialize, Default, Debug)]
struct EchoInput {
    message: String,
}

/// Output structure for the echo handler.
#[derive(Serialize, Debug)]
struct EchoOutput {
    echo: String,
    from: String,
}

fn echo(ctx: &mut Context, data: EchoInput) -> wirecall::Result<EchoOutput> {
    let upper = ctx.query().get("upper").is_some();
    let echo = if upper {
        data.message.to_uppercase()
    } else {
        data.message
    };
    Ok(EchoOutput {
        echo,
        from: ctx.ip(),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:7070".to_string());

    let peer = Peer::builder()
        .pull("/echo", echo)
        .pull("/echo/msgpack", |ctx, data: EchoInput| {
            ctx.set_codec("msgpack");
            echo(ctx, data)
        })
        .push("/ping", |ctx, _: ()| {
            println!("ping from {}", ctx.ip());
            Ok(())
        })
        .build();

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    println!("echo peer listening on {}", addr);

    Arc::new(peer).serve(listener).await?;
    Ok(())
}
