use std::collections::hash_map::RandomState;

use clap::Parser;
use clap::ValueEnum;
use group_hash::HashMap;
use group_hash::Uint64Map;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Layout {
    /// Generic map with overflow chains, keyed by randomly seeded hashes.
    Generic,
    /// Flat `u64` map, keyed by the raw key.
    Uint64,
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// How many entries to insert, as a multiple of the initial capacity.
    #[arg(short = 'f', long = "fill", default_value_t = 1.0)]
    fill: f64,

    /// Multiplier applied to each key; powers of two show raw-key clustering
    /// in the `u64` map.
    #[arg(short = 's', long = "stride", default_value_t = 1)]
    stride: u64,

    #[arg(short = 'l', long = "layout", value_enum, default_value_t = Layout::Generic)]
    layout: Layout,
}

fn main() {
    let args = Args::parse();

    println!(
        "Creating {:?} map with target capacity: {}",
        args.layout, args.target_capacity
    );

    match args.layout {
        Layout::Generic => {
            let mut map: HashMap<u64, u64, RandomState> =
                HashMap::with_capacity(args.target_capacity);
            let initial = map.capacity();
            println!("Actual capacity: {initial}");

            let num_values = (initial as f64 * args.fill) as u64;
            for i in 1..=num_values {
                map.insert(i * args.stride, i);
            }

            println!("Inserted {} values, capacity now {}", map.len(), map.capacity());
            map.debug_stats().print();
        }
        Layout::Uint64 => {
            let mut map = Uint64Map::with_capacity(args.target_capacity);
            let initial = map.capacity();
            println!("Actual capacity: {initial}");

            let num_values = (initial as f64 * args.fill) as u64;
            for i in 1..=num_values {
                map.insert(i * args.stride, i);
            }

            println!("Inserted {} values, capacity now {}", map.len(), map.capacity());
            map.debug_stats().print();
        }
    }
}
