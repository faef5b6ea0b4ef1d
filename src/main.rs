use std::process::ExitCode;

use epibatch::runner::run_with_args;

fn main() -> ExitCode {
    match run_with_args() {
        Ok(results) => {
            let statistics = results.statistics();
            println!("runs               {}", statistics.runs);
            println!("mean duration      {}", statistics.mean_duration);
            println!("mean infected      {}", statistics.mean_infected);
            println!("duration variance  {}", statistics.duration_variance);
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("epibatch: {error}");
            ExitCode::FAILURE
        }
    }
}
