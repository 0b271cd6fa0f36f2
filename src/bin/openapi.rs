use anyhow::Result;

fn main() -> Result<()> {
    let doc = citamed::citamed::openapi();
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}
