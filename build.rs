fn main() {
    // Engage the ESP-IDF build system only for Xtensa targets; host builds
    // (tests, the simulation binary) skip it entirely
    if let Ok(target) = std::env::var("TARGET") {
        if target.contains("xtensa") {
            embuild::espidf::sysenv::output();
        }
    }
}
