use arena::{array::DynArray, heap::Heap};

fn main() {
    env_logger::init();

    let mut heap = Heap::new(32);
    let mut bytes = DynArray::default();

    // Ten pushes force the eight-byte block to double once
    for byte in 1..=10 {
        bytes.push(&mut heap, byte).unwrap();
    }

    println!("{:?} {:?}", heap.as_bytes(), bytes);

    bytes.free(&mut heap);
    println!("{:?}", heap.as_bytes());
}
