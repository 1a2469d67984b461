use super::*;
use crate::constants::DEFAULT_COST_SET;
use crate::geometry::GeometryIndex;
use crate::test_utils::{cuboid, floor_with_box, floor_with_wall, flat_floor, plane, ramp, wall_x};
use crate::threading::CoreCount;

fn floor_with_platform(height: f32) -> GeometryIndex {
  GeometryIndex::build(vec![
    plane(10.0, 0.0, 0),
    cuboid(Vec3::new(2.5, -1.5, 0.0), Vec3::new(4.5, 1.5, height), 1),
  ])
  .unwrap()
}

fn serial() -> GeneratorConfig {
  GeneratorConfig::default().with_cores(CoreCount::Serial)
}

// =============================================================================
// Start validation
// =============================================================================

#[test]
fn test_seed_is_node_zero_on_the_ground() {
  let index = flat_floor();
  let graph = generate(&index, Vec3::new(0.0, 0.0, 1.0), serial().with_max_nodes(5))
    .unwrap()
    .unwrap();
  assert_eq!(graph.nodes()[0].position, Vec3::ZERO);
  assert!(graph.nodes().iter().all(|n| n.position.z == 0.0));
  assert!(graph.nodes().iter().all(|n| n.node_type == NodeType::Graph));
}

#[test]
fn test_start_off_the_geometry() {
  let index = flat_floor();
  assert!(generate(&index, Vec3::new(50.0, 50.0, 1.0), serial()).unwrap().is_none());
}

#[test]
fn test_start_on_obstacle() {
  let index = floor_with_box();
  let config = serial().with_obstacles([1]);
  assert!(generate(&index, Vec3::new(3.0, 0.0, 5.0), config).unwrap().is_none());
}

/// A seed walled in on every side has no accessible neighbor.
#[test]
fn test_enclosed_seed_gives_no_graph() {
  let index = GeometryIndex::build(vec![
    plane(10.0, 0.0, 0),
    wall_x(0.5, -1.0, 1.0, 0.0, 5.0, 1),
    wall_x(-0.5, -1.0, 1.0, 0.0, 5.0, 2),
    cuboid(Vec3::new(-1.0, 0.5, 0.0), Vec3::new(1.0, 1.0, 5.0), 3),
    cuboid(Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, -0.5, 5.0), 4),
  ])
  .unwrap();
  let config = serial().with_spacing(Vec3::new(1.0, 1.0, 0.5));
  assert!(generate(&index, Vec3::new(0.0, 0.0, 1.0), config).unwrap().is_none());
}

// =============================================================================
// Expansion
// =============================================================================

#[test]
fn test_edges_cost_their_length() {
  let index = flat_floor();
  let graph = generate(&index, Vec3::new(0.0, 0.0, 1.0), serial().with_max_nodes(20))
    .unwrap()
    .unwrap();
  for edge in graph.edges(DEFAULT_COST_SET).unwrap() {
    let a = graph.nodes()[edge.parent].position;
    let b = graph.nodes()[edge.child].position;
    assert!((edge.cost - a.distance(b)).abs() < 1e-5);
    assert!(edge.cost == 1.0 || (edge.cost - 2f32.sqrt()).abs() < 1e-4);
  }
}

#[test]
fn test_fully_expanded_floor_is_symmetric() {
  let index = GeometryIndex::from_mesh(plane(3.2, 0.0, 0)).unwrap();
  let graph = generate(&index, Vec3::new(0.0, 0.0, 1.0), serial()).unwrap().unwrap();
  // 7 x 7 grid from -3 to 3
  assert_eq!(graph.node_count(), 49);
  for edge in graph.edges(DEFAULT_COST_SET).unwrap() {
    assert!(graph.has_edge(edge.child, edge.parent, false));
  }
}

/// Children left on the frontier still link back to their parent.
#[test]
fn test_unexpanded_children_link_back_to_parent() {
  let index = flat_floor();
  let graph = generate(&index, Vec3::new(0.0, 0.0, 1.0), serial().with_max_nodes(1))
    .unwrap()
    .unwrap();
  let edges = graph.edges(DEFAULT_COST_SET).unwrap();
  assert_eq!(graph.node_count(), 9);
  assert_eq!(edges.len(), 16);

  let one_way = edges
    .iter()
    .filter(|e| !graph.has_edge(e.child, e.parent, false))
    .count();
  assert_eq!(one_way, 0);
  for edge in &edges {
    let back = graph.get_cost(edge.child, edge.parent, DEFAULT_COST_SET).unwrap();
    assert_eq!(back, edge.cost);
  }

  for child in 1..graph.node_count() {
    let path = crate::pathfinding::shortest_path(&graph, child, 0, DEFAULT_COST_SET)
      .unwrap()
      .expect("every child reaches the seed");
    assert_eq!(path.end(), 0);
  }
}

#[test]
fn test_max_nodes_caps_expansion() {
  let index = flat_floor();
  let generator = GraphGenerator::new(&index, serial().with_max_nodes(10));
  let (graph, stats) = generator
    .generate_with_stats(Vec3::new(0.0, 0.0, 1.0))
    .unwrap()
    .unwrap();
  assert_eq!(stats.expanded, 10);
  assert_eq!(stats.nodes, graph.node_count());
  assert_eq!(stats.edges, graph.edge_count());
}

#[test]
fn test_wall_blocks_expansion() {
  let index = floor_with_wall();
  let graph = generate(&index, Vec3::new(0.0, 0.0, 1.0), serial()).unwrap().unwrap();
  assert!(graph.node_count() > 10);
  assert!(graph.nodes().iter().all(|n| n.position.x < 0.5));
}

#[test]
fn test_obstacles_are_never_walkable() {
  let index = floor_with_platform(0.1);
  let start = Vec3::new(0.0, 0.0, 1.0);

  let open = generate(&index, start, serial()).unwrap().unwrap();
  assert!(open.nodes().iter().any(|n| (n.position.z - 0.1).abs() < 1e-4));

  let blocked = generate(&index, start, serial().with_obstacles([1])).unwrap().unwrap();
  assert!(blocked.nodes().iter().all(|n| n.position.z == 0.0));
  assert!(blocked.node_count() < open.node_count());
}

#[test]
fn test_step_limits() {
  let index = floor_with_platform(0.5);
  let start = Vec3::new(0.0, 0.0, 1.0);

  let low_steps = generate(&index, start, serial()).unwrap().unwrap();
  assert!(low_steps.nodes().iter().all(|n| n.position.z == 0.0));

  let high_steps = generate(&index, start, serial().with_steps(1.0, 1.0))
    .unwrap()
    .unwrap();
  let on_top: Vec<usize> = high_steps
    .nodes()
    .iter()
    .filter(|n| (n.position.z - 0.5).abs() < 1e-4)
    .map(|n| n.id)
    .collect();
  assert!(!on_top.is_empty());
  // Platform nodes are reachable from the floor and back
  let top = on_top[0];
  assert!(!high_steps.undirected_edges(top, DEFAULT_COST_SET).unwrap().is_empty());
}

#[test]
fn test_slope_limits() {
  let index = GeometryIndex::from_mesh(ramp(5.0, 0.3, 0)).unwrap();
  let start = Vec3::new(0.0, 0.0, 2.0);
  let steep_ok = serial().with_steps(1.0, 1.0).with_slopes(20.0, 20.0);
  let graph = generate(&index, start, steep_ok.clone()).unwrap().unwrap();
  let nodes = graph.nodes();
  assert!(graph
    .edges(DEFAULT_COST_SET)
    .unwrap()
    .iter()
    .any(|e| nodes[e.parent].position.x != nodes[e.child].position.x));

  let graph = generate(&index, start, steep_ok.with_slopes(10.0, 10.0))
    .unwrap()
    .unwrap();
  let nodes = graph.nodes();
  // Only edges running across the ramp remain
  for edge in graph.edges(DEFAULT_COST_SET).unwrap() {
    assert_eq!(nodes[edge.parent].position.x, nodes[edge.child].position.x);
  }
}

// =============================================================================
// Connection checks
// =============================================================================

#[test]
fn test_connection_step_types() {
  let floor = flat_floor();
  let generator = GraphGenerator::new(&floor, serial());
  assert_eq!(generator.check_connection(Vec3::ZERO, Vec3::X), Some(StepType::None));

  let walled = floor_with_wall();
  let generator = GraphGenerator::new(&walled, serial());
  assert_eq!(generator.check_connection(Vec3::ZERO, Vec3::X), None);

  let curb = GeometryIndex::build(vec![plane(10.0, 0.0, 0), wall_x(0.5, -10.0, 10.0, 0.0, 0.1, 3)]).unwrap();
  let generator = GraphGenerator::new(&curb, serial());
  assert_eq!(generator.check_connection(Vec3::ZERO, Vec3::X), Some(StepType::Over));

  let platform = floor_with_platform(0.1);
  let generator = GraphGenerator::new(&platform, serial());
  let low = Vec3::new(2.0, 0.0, 0.0);
  let high = Vec3::new(3.0, 0.0, 0.1);
  assert_eq!(generator.check_connection(low, high), Some(StepType::Up));
  assert_eq!(generator.check_connection(high, low), Some(StepType::Down));
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn test_topology_identical_across_core_counts() {
  let index = floor_with_box();
  let config = GeneratorConfig::default()
    .with_spacing(Vec3::new(0.5, 0.5, 1.0))
    .with_max_nodes(1200);
  let start = Vec3::new(-5.0, -5.0, 1.0);

  let run = |cores| {
    generate(&index, start, config.clone().with_cores(cores))
      .unwrap()
      .unwrap()
  };
  let reference = run(CoreCount::Serial);
  for cores in [CoreCount::Fixed(2), CoreCount::Fixed(3), CoreCount::All] {
    let graph = run(cores);
    assert_eq!(graph.positions(), reference.positions(), "{cores:?}");
    assert_eq!(
      graph.csr(DEFAULT_COST_SET).unwrap(),
      reference.csr(DEFAULT_COST_SET).unwrap(),
      "{cores:?}"
    );
  }
}
