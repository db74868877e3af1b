use clap::Parser;
use sitebones::SiteSkeleton;

mod args;
use args::{Args, convert_format};

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    ::log::info!("Starting skeleton crawl for: {}", args.url);

    println!("Note: crawling requires a WebDriver server (e.g. chromedriver).");
    println!(
        "Set WEBDRIVER_URL environment variable if not using the default http://localhost:4444"
    );

    let skeleton = SiteSkeleton::new(&args.url)
        .with_max_pages(args.max_pages)
        .with_max_depth(args.max_depth)
        .with_concurrency(args.concurrency);

    let report = match skeleton.run().await {
        Ok(report) => report,
        Err(e) => {
            ::log::error!("Crawl failed: {}", e);
            std::process::exit(1);
        }
    };

    // Aggregate statistics are printed no matter how individual pages fared
    let stats = report.statistics();
    let elapsed = report.elapsed().as_secs_f64();

    println!();
    println!("{}", "=".repeat(70));
    println!("Crawl completed in {:.2} seconds", elapsed);
    println!("Pages crawled: {}", stats.pages_crawled);
    if elapsed > 0.0 {
        println!(
            "Pages per second: {:.2}",
            stats.pages_crawled as f64 / elapsed
        );
    }
    println!("Total unique links found: {}", stats.total_links_found);
    println!();
    println!("Depth distribution:");
    for (depth, count) in &stats.depth_distribution {
        println!("  Level {}: {} pages", depth, count);
    }

    // Export results
    let output = report.export(convert_format(args.format));

    match args.output {
        Some(path) => match std::fs::write(&path, output) {
            Ok(()) => println!("\nResults saved to {}", path),
            Err(e) => {
                ::log::error!("Failed to write {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => println!("\n{}", output),
    }
}
