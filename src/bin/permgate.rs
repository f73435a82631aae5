#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (action, globals) = permgate::cli::start()?;

    action.execute(&globals).await?;

    Ok(())
}

// The browser entry point is the library's `#[wasm_bindgen(start)]` hook.
#[cfg(target_arch = "wasm32")]
fn main() {}
