fn main() {
    careline_lib::run()
}
