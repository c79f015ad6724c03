use grow_r503::{AuraColor, AuraControl, Fingerprint, RxQueue, Status};
use serialport::{available_ports, open, prelude::*};
use std::{env, thread, time::Duration};

mod pc_utils;
use pc_utils::{spawn_reader, SerialWriter, StdDelay};

const DEFAULT_BAUD_RATE: u32 = 57600;

fn main() {
    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => print_ports(),
        2 => print_next_template_number(args[1].as_str()),
        3 => enroll_to_id(args[1].as_str(), args[2].parse::<u16>().unwrap()),
        _ => panic!("Usage: pc_enrollment [port_name] [location]"),
    };
}

fn print_ports() {
    let ports = available_ports().unwrap();
    for port in ports {
        println!("Available port: {} ({:#?})", port.port_name, port.port_type);
    }
}

fn open_sensor(port_name: &str) -> Fingerprint<'static, SerialWriter, StdDelay> {
    println!("Using port {}", port_name);
    let mut port = open(port_name).unwrap();
    port.set_baud_rate(DEFAULT_BAUD_RATE).unwrap();
    port.set_timeout(Duration::from_millis(50)).unwrap();
    let reader = port.try_clone().unwrap();

    let queue = Box::leak(Box::new(RxQueue::new()));
    let (producer, consumer) = queue.split();
    spawn_reader(reader, producer);

    Fingerprint::new(SerialWriter(port), consumer, StdDelay, 0x00000000)
}

fn print_next_template_number(port_name: &str) {
    let mut sensor = open_sensor(port_name);

    println!("1. Verifying password");
    match sensor.verify_password() {
        Ok(true) => println!("Handshake ok"),
        Ok(false) => panic!("Wrong password"),
        Err(e) => panic!("Error: {:#?}", e),
    };

    println!("2. Checking next free template location");
    match sensor.get_template_count() {
        Ok(Status::Ok) => println!("Next free location: {}", sensor.template_count()),
        Ok(status) => panic!("Unexpected status: {:#?}", status),
        Err(e) => panic!("Error: {:#?}", e),
    };
}

fn enroll_to_id(port_name: &str, location: u16) {
    let mut sensor = open_sensor(port_name);

    println!("1. Verifying password");
    match sensor.verify_password() {
        Ok(true) => println!("Handshake ok"),
        Ok(false) => panic!("Wrong password"),
        Err(e) => panic!("Error: {:#?}", e),
    };

    println!("2. First capture - place a finger on the sensor");
    capture_into_buffer(&mut sensor, 1);

    println!("3. Remove the finger");
    thread::sleep(Duration::from_secs(2));

    println!("4. Second capture - place the same finger again");
    capture_into_buffer(&mut sensor, 2);

    println!("5. Creating the model");
    match sensor.create_model() {
        Ok(Status::Ok) => {}
        Ok(Status::EnrollMismatch) => panic!("The two captures do not match, try again"),
        Ok(status) => panic!("Unexpected status: {:#?}", status),
        Err(e) => panic!("Error: {:#?}", e),
    };

    println!("6. Storing the model at location {}", location);
    match sensor.store_model(location) {
        Ok(Status::Ok) => println!("Enrolled!"),
        Ok(status) => panic!("Unexpected status: {:#?}", status),
        Err(e) => panic!("Error: {:#?}", e),
    };

    // Victory lap on modules with an aura ring; harmless elsewhere.
    let _ = sensor.aura_led_config(AuraControl::Flashing, 0x40, AuraColor::Blue, 3);
}

fn capture_into_buffer(sensor: &mut Fingerprint<'static, SerialWriter, StdDelay>, slot: u8) {
    loop {
        match sensor.get_image() {
            Ok(Status::Ok) => break,
            Ok(Status::NoFinger) => {
                thread::sleep(Duration::from_millis(100));
            }
            Ok(status) => panic!("Unexpected status: {:#?}", status),
            Err(e) => panic!("Error: {:#?}", e),
        }
    }

    match sensor.image_to_tz(slot) {
        Ok(Status::Ok) => println!("Captured into buffer {}", slot),
        Ok(status) => panic!("Unexpected status: {:#?}", status),
        Err(e) => panic!("Error: {:#?}", e),
    };
}
