use mempool::{HEADER_SIZE, MAX_ALIGN, MemPool, align_down, print_alloc};

const STORAGE_SIZE: usize = 2000;

/// HEAD, TAIL and the header of the single free block eat into the arena.
const MAX_ALLOCATABLE: usize = align_down!(STORAGE_SIZE - 3 * HEADER_SIZE);

/// Keeps the arena start aligned so offsets line up with the numbers above.
#[repr(C, align(64))]
struct Storage([u8; STORAGE_SIZE]);

fn allocate(
  pool: &mut MemPool<'_>,
  size: usize,
) -> usize {
  match pool.alloc(size) {
    Some(offset) => {
      print_alloc(pool, size, offset);
      assert_eq!(pool.address_of(offset) % MAX_ALIGN, 0);
      offset
    }
    None => panic!("allocation of {} bytes failed", size),
  }
}

fn release(
  pool: &mut MemPool<'_>,
  offset: usize,
) {
  let status = pool.free(offset);
  println!("Freed offset = {:#x}, status = {:?}", offset, status);
  pool.debug_print();
}

fn main() {
  let mut storage = Storage([0; STORAGE_SIZE]);
  let mut pool = MemPool::init(&mut storage.0).expect("arena is large enough");

  println!("Pool ready: {:?}", pool.stats());
  pool.debug_print();

  // --------------------------------------------------------------------
  // 1) Fill the pool. The raw arena size never fits because of the
  //    headers, and once the five blocks are out nothing is left.
  // --------------------------------------------------------------------
  println!("\n[1] Sequential allocation");
  assert_eq!(pool.alloc(STORAGE_SIZE), None);

  let blocks: Vec<usize> = [101, 202, 303, 404, 808]
    .into_iter()
    .map(|size| allocate(&mut pool, size))
    .collect();

  println!("[1] alloc(100) on a full pool = {:?}", pool.alloc(100));

  for offset in blocks {
    release(&mut pool, offset);
  }

  let whole = allocate(&mut pool, MAX_ALLOCATABLE);
  release(&mut pool, whole);

  // --------------------------------------------------------------------
  // 2) First fit hands a freed block straight back out.
  // --------------------------------------------------------------------
  println!("\n[2] Reuse of a freed block");
  let m2 = allocate(&mut pool, 101);
  let m3 = allocate(&mut pool, 202);
  release(&mut pool, m2);

  let m4 = allocate(&mut pool, 30);
  println!(
    "[2] m4 == m2? {}",
    if m4 == m2 { "Yes, the freed block was reused" } else { "No" }
  );

  release(&mut pool, m4);
  release(&mut pool, m3);

  // --------------------------------------------------------------------
  // 3) Freeing the middle block last merges all three into one.
  // --------------------------------------------------------------------
  println!("\n[3] Coalescing");
  let m2 = allocate(&mut pool, 101);
  let m3 = allocate(&mut pool, 202);
  let m4 = allocate(&mut pool, 30);

  release(&mut pool, m2);
  release(&mut pool, m4);
  release(&mut pool, m3);

  let whole = allocate(&mut pool, MAX_ALLOCATABLE);
  release(&mut pool, whole);

  // --------------------------------------------------------------------
  // 4) Bad pointers are rejected without touching the pool.
  // --------------------------------------------------------------------
  println!("\n[4] Invalid frees");
  println!("[4] free(null)       = {:?}", pool.free_ptr(std::ptr::null()));
  println!("[4] free(misaligned) = {:?}", pool.free(HEADER_SIZE + 1));
  println!("[4] free(0)          = {:?}", pool.free(0));

  println!("\nDone: {:?}", pool.stats());
}
