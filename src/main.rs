use gridemic::metrics::ContextMetricsExt;
use gridemic::runner::run_with_args;

fn main() {
    let context = match run_with_args(|_, _, _| Ok(())) {
        Ok(context) => context,
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    };

    if let Some(snapshot) = context.snapshot_history().last() {
        println!("tick {}", snapshot.tick());
        for (metric, count) in snapshot.metrics() {
            println!("{metric}: {count}");
        }
    }
}
