use ordmap::{AvlMap, BstMap};

fn main() {
    let mut map = AvlMap::new();
    map.insert(0, "zero");
    map.insert(1, "one");
    map.insert(2, "two");
    map.insert(2, "two");
    map.insert(3, "three");
    map.insert(4, "four");
    map.insert(5, "five");
    assert_eq!(map.get(&1), Some(&"one"));
    map.remove(&1);
    assert!(map.get(&1).is_none());

    for (k, v) in &map {
        println!("{k} => {v}");
    }

    println!("{map}");

    let mut out = String::new();
    map.print_to(&mut out).unwrap();
    print!("{out}");

    let mut bst = BstMap::new();
    for x in 0..5 {
        bst.insert(x, x * x);
    }
    assert!(bst.contains_key(&3));
    bst.remove(&3);
    assert!(!bst.contains_key(&3));
    println!("{bst}");
}
