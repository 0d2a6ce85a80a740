fn main() {
    println!("cargo:rerun-if-changed=components/esp-idf-rc522");
    println!("cargo:rerun-if-changed=components/rfid_port_glue");

    // Host builds (`--no-default-features`) have no ESP-IDF environment to export.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
