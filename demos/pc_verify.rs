use grow_r503::{Fingerprint, RxQueue};
use serialport::{available_ports, open, prelude::*};
use std::{env, time::Duration};

mod pc_utils;
use pc_utils::{spawn_reader, SerialWriter, StdDelay};

const DEFAULT_BAUD_RATE: u32 = 57600;

fn main() {
    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => print_ports(),
        2 => run_verify(args[1].as_str()),
        _ => panic!("Usage: pc_verify [port_name]"),
    };
}

fn print_ports() {
    let ports = available_ports().unwrap();
    for port in ports {
        println!("Available port: {} ({:#?})", port.port_name, port.port_type);
    }
}

fn run_verify(port_name: &str) {
    println!("Using port {}", port_name);
    let mut port = open(port_name).unwrap();
    port.set_baud_rate(DEFAULT_BAUD_RATE).unwrap();
    port.set_timeout(Duration::from_millis(50)).unwrap();
    let reader = port.try_clone().unwrap();

    let queue = Box::leak(Box::new(RxQueue::new()));
    let (producer, consumer) = queue.split();
    spawn_reader(reader, producer);

    let mut sensor = Fingerprint::new(SerialWriter(port), consumer, StdDelay, 0x00000000);

    println!("1. Verifying password");
    match sensor.verify_password() {
        Ok(true) => println!("Handshake ok"),
        Ok(false) => panic!("Wrong password"),
        Err(e) => panic!("Error: {:#?}", e),
    };

    println!("2. Reading system parameters");
    match sensor.get_parameters() {
        Ok(status) => println!("[{:?}] {:#?}", status, sensor.parameters()),
        Err(e) => panic!("Error: {:#?}", e),
    };

    println!("3. Reading template count");
    match sensor.get_template_count() {
        Ok(status) => println!("[{:?}] {} template(s) stored", status, sensor.template_count()),
        Err(e) => panic!("Error: {:#?}", e),
    };
}
