use std::time::Duration;

use kanshi::{Change, ChangeOrigin, ObserveOptions, Result, Session, Target};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let session = Session::new();
    let state = Target::from_iter([("lease", 42)]);

    session.observe_with(
        &state,
        "lease",
        |change: &Change| {
            if change.origin == ChangeOrigin::Removal {
                println!("lease disappeared (last value {:?})", change.old);
            } else {
                println!("lease changed: {:?} -> {:?}", change.old, change.new);
            }
        },
        ObserveOptions::default().with_poll_interval_ms(50),
    )?;

    state.set("lease", 43)?;

    // Removal bypasses the accessor layer; the poller notices it within
    // one polling period and auto-unobserves the property.
    state.remove("lease")?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    session.shutdown().await;
    Ok(())
}
