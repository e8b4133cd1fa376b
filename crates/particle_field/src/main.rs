//! Just `main()`. Keep as small as possible.

use color_eyre::eyre::Result;

#[expect(
    clippy::print_stderr,
    reason = "It's our central place for communicating with the user on CLI"
)]
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let result = particle_field::run::run().await;
    tracing::debug!("Particle field is exiting");

    if let Err(error) = result {
        tracing::error!("{error:?}");
        eprintln!("Error: {error}");
        return Err(error);
    }

    Ok(())
}
