//! Resolve command - one lookup from the command line

use crate::cli::args::{ResolveArgs, ResponseFormat};
use crate::cli::commands::open_result_cache;
use crate::config::Config;
use crate::error::GenrepoResult;
use crate::service::{Genrepo, ResolveRequest, Response};

/// Execute the resolve command, returning whether the lookup succeeded
pub async fn execute(args: ResolveArgs, config: &Config) -> GenrepoResult<bool> {
    let cache = open_result_cache(config).await?;
    let service = Genrepo::from_config(config, cache);

    let request = ResolveRequest::new(
        args.distro,
        args.releasever,
        args.arch,
        args.url,
        args.reference,
    )
    .allow_stale(args.allow_stale);

    let response = service.resolve(&request).await;
    print_response(&response, args.format)?;
    Ok(response.is_success())
}

fn print_response(response: &Response, format: ResponseFormat) -> GenrepoResult<()> {
    match format {
        ResponseFormat::Json => println!("{}", serde_json::to_string(response)?),
        ResponseFormat::Plain if response.is_success() => println!("{}", response.message),
        ResponseFormat::Plain => eprintln!("{}", response.message),
    }
    Ok(())
}
