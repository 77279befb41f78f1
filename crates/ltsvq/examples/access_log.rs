/// Access Log Demo
///
/// Folds access-log lines with varying fields into one relation and runs a
/// few reports over it.
use ltsvq::{ingest, Delimiters, LtsvTable, OutputFormatter};
use std::io;

const LOG: &str = "\
host:192.168.0.1\tmethod:GET\tpath:/\tstatus:200\tsize:1024\treqtime:0.012
host:192.168.0.2\tmethod:GET\tpath:/search?q=rust\tstatus:200\tsize:8812\treqtime:0.340
host:192.168.0.1\tmethod:POST\tpath:/login\tstatus:302\treqtime:0.051\tua:curl/8.0
this line is not LTSV
host:192.168.0.3\tmethod:GET\tpath:/admin\tstatus:403\tsize:0
host:192.168.0.2\tmethod:GET\tpath:/static/app.js\tstatus:304\treqtime:0.002
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== ltsvq Access Log Demo ===\n");

    let mut table = LtsvTable::new();
    let stats = ingest(&mut table, LOG.as_bytes(), Delimiters::default())?;
    println!(
        "Ingested {} of {} lines; columns: {}\n",
        stats.inserted,
        stats.lines,
        table.columns().join(", ")
    );

    for sql in [
        "SELECT host, COUNT(*) AS hits, SUM(size) AS bytes FROM ltsv GROUP BY host ORDER BY hits DESC",
        "SELECT path, reqtime FROM ltsv WHERE reqtime > 0.05 ORDER BY reqtime DESC",
        "SELECT path, status FROM ltsv WHERE ua IS NOT NULL OR status >= 400",
    ] {
        println!("{}", sql);
        let rows = table.query(sql)?;
        let mut out = OutputFormatter::new(io::stdout().lock());
        out.write_all(&rows)?;
        out.finish()?;
        println!();
    }

    Ok(())
}
