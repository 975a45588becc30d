use std::str::FromStr;
use std::thread;
use std::time::Duration;

use chrono::Local;
use cronex::{Cron, CronParser, CronScheduler, SchedulerConfig};

fn main() {
    let every_two_seconds = CronParser::builder()
        .seconds(true)
        .build()
        .parse("*/2 * * * * *")
        .expect("valid pattern");
    let weekdays = Cron::from_str("0 9 * * MON-FRI").expect("valid pattern");

    let now = Local::now();
    for cron in [&every_two_seconds, &weekdays] {
        let next = cron
            .find_next_occurrence(&now, &(now + chrono::Duration::days(7)))
            .map(|time| time.to_string())
            .unwrap_or_else(|error| error.to_string());
        println!("Pattern \"{cron}\" will match next at {next}");
    }

    let config = SchedulerConfig::builder()
        .tick_interval(Duration::from_secs(1))
        .worker_threads(2)
        .build();
    let scheduler = CronScheduler::new(config);

    scheduler
        .add("startup", Cron::reboot(), || println!("started at {}", Local::now()))
        .expect("unique name");
    scheduler
        .add("tick", every_two_seconds, || println!("tick at {}", Local::now()))
        .expect("unique name");
    scheduler
        .add("standup", weekdays, || println!("time for standup"))
        .expect("unique name");

    println!("Entries: {:?}", scheduler.names());
    scheduler.start().expect("scheduler starts once");
    thread::sleep(Duration::from_secs(7));
    scheduler.close();
}
